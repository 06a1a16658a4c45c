pub mod dashboard;
pub mod dependency;
pub mod key;
pub mod serve;
pub mod server;
pub mod service;

use std::path::Path;

use crate::cli::error::CliResult;
use crate::db::{Database, SqliteDatabase};

/// Common pagination parameters for all list commands
#[derive(Debug, Default, Clone, Copy)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageParams {
    /// Append `limit`/`offset` to a query string.
    pub fn push_query(&self, query: &mut Vec<(&'static str, String)>) {
        if let Some(l) = self.limit {
            query.push(("limit", l.to_string()));
        }
        if let Some(o) = self.offset {
            query.push(("offset", o.to_string()));
        }
    }
}

/// Open the database at `path`, creating its directory and applying migrations.
pub async fn open_database(path: &Path) -> CliResult<SqliteDatabase> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let db = SqliteDatabase::open(path).await?;
    db.migrate().await?;
    Ok(db)
}

#[cfg(test)]
#[path = "test_support.rs"]
mod test_support;





#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;
