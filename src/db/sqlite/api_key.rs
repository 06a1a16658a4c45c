//! SQLite ApiKeyRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{map_read_error, map_write_error};
use crate::db::utils::{
    current_timestamp, format_timestamp, parse_optional_timestamp, parse_timestamp,
};
use crate::db::{ApiKey, ApiKeyRepository, DbError, DbResult, Id, NewApiKey};

const API_KEY_COLUMNS: &str =
    "id, user_id, name, key_prefix, key_hash, permissions, last_used_at, expires_at, created_at";

/// SQLx-backed API key repository.
pub struct SqliteApiKeyRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn row_to_api_key(row: &SqliteRow) -> DbResult<ApiKey> {
    let permissions_json: String = row.get("permissions");
    let permissions: Vec<String> = serde_json::from_str(&permissions_json).unwrap_or_default();
    let created_at: String = row.get("created_at");
    Ok(ApiKey {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        key_prefix: row.get("key_prefix"),
        key_hash: row.get("key_hash"),
        permissions,
        last_used_at: parse_optional_timestamp(row.get("last_used_at"))?,
        expires_at: parse_optional_timestamp(row.get("expires_at"))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl ApiKeyRepository for SqliteApiKeyRepository<'_> {
    async fn create(&self, key: &NewApiKey) -> DbResult<ApiKey> {
        let permissions =
            serde_json::to_string(&key.permissions).unwrap_or_else(|_| "[]".to_string());

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO api_key (user_id, name, key_prefix, key_hash, permissions, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(key.user_id)
        .bind(&key.name)
        .bind(&key.key_prefix)
        .bind(&key.key_hash)
        .bind(&permissions)
        .bind(key.expires_at.as_ref().map(format_timestamp))
        .bind(current_timestamp())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("ApiKey", &format!("prefix '{}'", key.key_prefix), e))?;

        let row = sqlx::query(&format!("SELECT {} FROM api_key WHERE id = ?", API_KEY_COLUMNS))
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(map_read_error)?;

        row_to_api_key(&row)
    }

    async fn get_by_prefix(&self, prefix: &str) -> DbResult<Option<ApiKey>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM api_key WHERE key_prefix = ?",
            API_KEY_COLUMNS
        ))
        .bind(prefix)
        .fetch_optional(self.pool)
        .await
        .map_err(map_read_error)?;

        row.as_ref().map(row_to_api_key).transpose()
    }

    async fn list(&self, user_id: Option<Id>) -> DbResult<Vec<ApiKey>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {} FROM api_key WHERE user_id = ? ORDER BY created_at DESC, id DESC",
                    API_KEY_COLUMNS
                ))
                .bind(user_id)
                .fetch_all(self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM api_key ORDER BY created_at DESC, id DESC",
                    API_KEY_COLUMNS
                ))
                .fetch_all(self.pool)
                .await
            }
        }
        .map_err(map_read_error)?;

        rows.iter().map(row_to_api_key).collect()
    }

    async fn touch(&self, id: Id) -> DbResult<()> {
        sqlx::query("UPDATE api_key SET last_used_at = ? WHERE id = ?")
            .bind(current_timestamp())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(map_read_error)?;
        Ok(())
    }

    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM api_key WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(map_read_error)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ApiKey", id));
        }

        Ok(())
    }
}
