//! `svcmap serve` - REST API, MCP endpoint and web pages

use std::path::Path;

use crate::api::{self, Config};
use crate::cli::commands::open_database;
use crate::cli::error::CliResult;

/// Open the database and run the server until it stops.
pub async fn run(db_path: &Path, config: Config) -> CliResult<()> {
    println!("Opening database at {}", db_path.display());
    let db = open_database(db_path).await?;
    println!("Database migrations complete");

    let base = format!("http://{}:{}", config.host, config.port);
    println!();
    println!("svcmap starting...");
    println!("   Web:      {}/", base);
    println!("   API:      {}/api/v1", base);
    println!("   MCP:      {}/mcp", base);
    if config.enable_docs {
        println!("   Docs:     {}/docs", base);
    }
    println!("   Uploads:  {}", config.upload_dir.display());
    if config.oauth.is_none() {
        println!("   Login:    disabled (no OAuth provider configured)");
    }
    println!();

    api::run(config, db).await?;
    Ok(())
}
