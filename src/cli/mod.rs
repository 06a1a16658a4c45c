pub mod api_client;
mod commands;
pub mod error;
mod utils;


use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::api::Config;
use crate::auth::oauth::OAuthConfig;
use crate::cli::commands::PageParams;
use crate::cli::error::{CliError, CliResult};
use crate::paths;

#[derive(Parser)]
#[command(name = "svcmap")]
#[command(author, version, about = "Server and service inventory", long_about = None)]
pub struct Cli {
    /// API URL (default: http://localhost:3000)
    #[arg(long, global = true, env = "SVCMAP_API_URL")]
    pub api_url: Option<String>,

    /// API key for authenticated requests
    #[arg(long, global = true, env = "SVCMAP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Database file (default: XDG data directory, svcmap/svcmap.db)
    #[arg(long, global = true, env = "SVCMAP_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server, REST API and MCP endpoint
    Serve(ServeArgs),
    /// API key management (local database)
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Server inventory
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },
    /// Services running on servers
    Service {
        #[command(subcommand)]
        command: ServiceCommands,
    },
    /// Service-to-service dependencies
    Dependency {
        #[command(subcommand)]
        command: DependencyCommands,
    },
    /// Inventory overview
    Dashboard {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "SVCMAP_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "SVCMAP_PORT")]
    port: u16,

    /// Directory for uploaded service icons
    #[arg(long, env = "SVCMAP_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Serve the Scalar API docs at /docs
    #[arg(long, env = "SVCMAP_DOCS")]
    docs: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Mark the session cookie Secure (use behind HTTPS)
    #[arg(long, env = "SVCMAP_SECURE_COOKIES")]
    secure_cookies: bool,

    #[command(flatten)]
    oauth: OAuthArgs,
}

#[derive(Args)]
struct OAuthArgs {
    #[arg(long, env = "SVCMAP_OAUTH_CLIENT_ID")]
    oauth_client_id: Option<String>,

    #[arg(long, env = "SVCMAP_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    oauth_client_secret: Option<String>,

    #[arg(long, env = "SVCMAP_OAUTH_AUTHORIZE_URL")]
    oauth_authorize_url: Option<String>,

    #[arg(long, env = "SVCMAP_OAUTH_TOKEN_URL")]
    oauth_token_url: Option<String>,

    #[arg(long, env = "SVCMAP_OAUTH_USERINFO_URL")]
    oauth_userinfo_url: Option<String>,

    /// Absolute URL of /auth/callback
    #[arg(long, env = "SVCMAP_OAUTH_REDIRECT_URL")]
    oauth_redirect_url: Option<String>,

    #[arg(long, env = "SVCMAP_OAUTH_SCOPES", default_value = "")]
    oauth_scopes: String,
}

impl OAuthArgs {
    /// `None` when nothing is set; an error when only part of the provider is configured.
    fn oauth_config(self) -> CliResult<Option<OAuthConfig>> {
        match (
            self.oauth_client_id,
            self.oauth_client_secret,
            self.oauth_authorize_url,
            self.oauth_token_url,
            self.oauth_userinfo_url,
            self.oauth_redirect_url,
        ) {
            (None, None, None, None, None, None) => Ok(None),
            (
                Some(client_id),
                Some(client_secret),
                Some(authorize_url),
                Some(token_url),
                Some(userinfo_url),
                Some(redirect_url),
            ) => Ok(Some(OAuthConfig {
                client_id,
                client_secret,
                authorize_url,
                token_url,
                userinfo_url,
                redirect_url,
                scopes: self.oauth_scopes,
            })),
            (client_id, client_secret, authorize_url, token_url, userinfo_url, redirect_url) => {
                let missing: Vec<&str> = [
                    ("client id", client_id.is_none()),
                    ("client secret", client_secret.is_none()),
                    ("authorize url", authorize_url.is_none()),
                    ("token url", token_url.is_none()),
                    ("userinfo url", userinfo_url.is_none()),
                    ("redirect url", redirect_url.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect();
                Err(CliError::Config {
                    message: format!("incomplete OAuth provider, missing {}", missing.join(", ")),
                })
            }
        }
    }
}

impl ServeArgs {
    fn into_config(self) -> CliResult<Config> {
        Ok(Config {
            host: self.host,
            port: self.port,
            verbosity: self.verbose,
            enable_docs: self.docs,
            upload_dir: self.upload_dir.unwrap_or_else(paths::default_upload_dir),
            secure_cookies: self.secure_cookies,
            oauth: self.oauth.oauth_config()?,
        })
    }
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a key; the plain key is printed once
    Create {
        name: String,
        /// Expire the key after this many days
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
    /// List keys (never shows the secret)
    List {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Revoke a key by id
    Revoke { id: i64 },
}

#[derive(Subcommand)]
enum ServerCommands {
    /// List servers
    List {
        /// Search name, IP and location
        #[arg(short, long)]
        q: Option<String>,
        /// Filter by hoster name
        #[arg(long)]
        hoster: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show a server with its services and children
    Get {
        id: i64,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// List services
    List {
        /// Only services on this server
        #[arg(long)]
        server_id: Option<i64>,
        /// Search name, path and note
        #[arg(short, long)]
        q: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show a service with its dependencies and dependents
    Get {
        id: i64,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
enum DependencyCommands {
    /// List dependency edges
    List {
        /// Only edges touching this service
        #[arg(long)]
        service_id: Option<i64>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(paths::default_db_path);
    let api_client = api_client::ApiClient::new(cli.api_url, cli.api_key);

    let output = match cli.command {
        Some(Commands::Serve(args)) => {
            let config = args.into_config()?;
            commands::serve::run(&db_path, config).await?;
            return Ok(());
        }
        Some(Commands::Key { command }) => {
            let db = commands::open_database(&db_path).await?;
            match command {
                KeyCommands::Create {
                    name,
                    expires_in_days,
                } => commands::key::create_key(&db, &name, expires_in_days).await,
                KeyCommands::List { format } => commands::key::list_keys(&db, &format).await,
                KeyCommands::Revoke { id } => commands::key::revoke_key(&db, id).await,
            }
        }
        Some(Commands::Server { command }) => match command {
            ServerCommands::List {
                q,
                hoster,
                limit,
                offset,
                format,
            } => {
                commands::server::list_servers(
                    &api_client,
                    q.as_deref(),
                    hoster.as_deref(),
                    PageParams { limit, offset },
                    &format,
                )
                .await
            }
            ServerCommands::Get { id, format } => {
                commands::server::get_server(&api_client, id, &format).await
            }
        },
        Some(Commands::Service { command }) => match command {
            ServiceCommands::List {
                server_id,
                q,
                limit,
                offset,
                format,
            } => {
                commands::service::list_services(
                    &api_client,
                    server_id,
                    q.as_deref(),
                    PageParams { limit, offset },
                    &format,
                )
                .await
            }
            ServiceCommands::Get { id, format } => {
                commands::service::get_service(&api_client, id, &format).await
            }
        },
        Some(Commands::Dependency { command }) => match command {
            DependencyCommands::List {
                service_id,
                limit,
                offset,
                format,
            } => {
                commands::dependency::list_dependencies(
                    &api_client,
                    service_id,
                    PageParams { limit, offset },
                    &format,
                )
                .await
            }
        },
        Some(Commands::Dashboard { format }) => {
            commands::dashboard::show_dashboard(&api_client, &format).await
        }
        None => {
            // Show help when no command provided
            let _ = Cli::parse_from(["svcmap", "--help"]);
            return Ok(());
        }
    }?;

    println!("{}", output);
    Ok(())
}
