//! API key management against the local database.
//!
//! Keys are needed before any API call can be made, so these commands talk
//! to the database directly instead of going through the API.

use chrono::{Duration, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::auth::api_key;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{apply_table_style, format_date};
use crate::db::{ApiKey, ApiKeyRepository, Database, Id};

#[derive(Debug, Serialize)]
struct KeySummary {
    id: Id,
    name: String,
    key_prefix: String,
    last_used_at: Option<String>,
    expires_at: Option<String>,
    created_at: String,
}

impl From<&ApiKey> for KeySummary {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name.clone(),
            key_prefix: key.key_prefix.clone(),
            last_used_at: key.last_used_at.map(|t| t.to_rfc3339()),
            expires_at: key.expires_at.map(|t| t.to_rfc3339()),
            created_at: key.created_at.to_rfc3339(),
        }
    }
}

#[derive(Tabled)]
struct KeyDisplay {
    #[tabled(rename = "ID")]
    id: Id,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Last used")]
    last_used: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl From<&KeySummary> for KeyDisplay {
    fn from(key: &KeySummary) -> Self {
        Self {
            id: key.id,
            name: key.name.clone(),
            prefix: key.key_prefix.clone(),
            last_used: format_date(key.last_used_at.as_deref()),
            expires: match key.expires_at.as_deref() {
                Some(t) => format_date(Some(t)),
                None => "-".to_string(),
            },
        }
    }
}

/// Issue a new key. The plain key is part of the output and never shown again.
pub async fn create_key<D: Database>(
    db: &D,
    name: &str,
    expires_in_days: Option<i64>,
) -> CliResult<String> {
    if name.trim().is_empty() {
        return Err(CliError::Config {
            message: "key name must not be empty".to_string(),
        });
    }
    let expires_at = match expires_in_days {
        Some(days) if days <= 0 => {
            return Err(CliError::Config {
                message: "--expires-in-days must be positive".to_string(),
            });
        }
        Some(days) => Some(Utc::now() + Duration::days(days)),
        None => None,
    };

    let (key, plain) = api_key::issue(db, None, name.trim(), expires_at).await?;
    Ok(format!(
        "Created API key '{}' (id {})\n\n    {}\n\nStore it now, it cannot be shown again.",
        key.name, key.id, plain
    ))
}

pub async fn list_keys<D: Database>(db: &D, format: &str) -> CliResult<String> {
    let keys = db.api_keys().list(None).await?;
    let summaries: Vec<KeySummary> = keys.iter().map(KeySummary::from).collect();

    match format {
        "json" => Ok(serde_json::to_string_pretty(&summaries)?),
        _ => Ok(format_table(&summaries)),
    }
}

fn format_table(keys: &[KeySummary]) -> String {
    if keys.is_empty() {
        return "No API keys found.".to_string();
    }

    let display: Vec<KeyDisplay> = keys.iter().map(KeyDisplay::from).collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    table.to_string()
}

pub async fn revoke_key<D: Database>(db: &D, id: Id) -> CliResult<String> {
    db.api_keys().delete(id).await?;
    Ok(format!("Revoked API key {}", id))
}
