//! SQLite UserRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{map_read_error, map_write_error};
use crate::db::utils::{current_timestamp, parse_timestamp};
use crate::db::{DbError, DbResult, Id, User, UserProfile, UserRepository};

/// SQLx-backed user repository.
pub struct SqliteUserRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn row_to_user(row: &SqliteRow) -> DbResult<User> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(User {
        id: row.get("id"),
        oauth_id: row.get("oauth_id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        avatar_url: row.get("avatar_url"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

impl UserRepository for SqliteUserRepository<'_> {
    async fn upsert(&self, profile: &UserProfile) -> DbResult<User> {
        let now = current_timestamp();
        let row = sqlx::query(
            "INSERT INTO app_user (oauth_id, email, full_name, avatar_url, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(oauth_id) DO UPDATE SET email = excluded.email, \
             full_name = excluded.full_name, avatar_url = excluded.avatar_url, \
             updated_at = excluded.updated_at \
             RETURNING id, oauth_id, email, full_name, avatar_url, created_at, updated_at",
        )
        .bind(&profile.oauth_id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("User", &profile.oauth_id, e))?;

        row_to_user(&row)
    }

    async fn get(&self, id: Id) -> DbResult<User> {
        let row = sqlx::query(
            "SELECT id, oauth_id, email, full_name, avatar_url, created_at, updated_at \
             FROM app_user WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(map_read_error)?
        .ok_or_else(|| DbError::not_found("User", id))?;

        row_to_user(&row)
    }
}
