//! SQLite HosterRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{map_read_error, map_write_error};
use crate::db::utils::{current_timestamp, parse_timestamp};
use crate::db::{DbError, DbResult, Hoster, HosterInput, HosterRepository, Id};

const HOSTER_COLUMNS: &str =
    "id, name, hoster_type, description, display_order, is_active, created_at, updated_at";

/// SQLx-backed hoster repository.
pub struct SqliteHosterRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn row_to_hoster(row: &SqliteRow) -> DbResult<Hoster> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(Hoster {
        id: row.get("id"),
        name: row.get("name"),
        hoster_type: row.get("hoster_type"),
        description: row.get("description"),
        display_order: row.get("display_order"),
        is_active: row.get("is_active"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

impl HosterRepository for SqliteHosterRepository<'_> {
    async fn create(&self, input: &HosterInput) -> DbResult<Hoster> {
        let now = current_timestamp();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO hoster (name, hoster_type, description, display_order, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.hoster_type)
        .bind(&input.description)
        .bind(input.display_order)
        .bind(input.is_active)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("Hoster", &format!("name '{}'", input.name), e))?;

        self.get(id).await
    }

    async fn get(&self, id: Id) -> DbResult<Hoster> {
        let row = sqlx::query(&format!("SELECT {} FROM hoster WHERE id = ?", HOSTER_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(map_read_error)?
            .ok_or_else(|| DbError::not_found("Hoster", id))?;

        row_to_hoster(&row)
    }

    async fn list(&self, active_only: bool) -> DbResult<Vec<Hoster>> {
        let where_clause = if active_only { "WHERE is_active = 1" } else { "" };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM hoster {} ORDER BY display_order ASC, name ASC",
            HOSTER_COLUMNS, where_clause
        ))
        .fetch_all(self.pool)
        .await
        .map_err(map_read_error)?;

        rows.iter().map(row_to_hoster).collect()
    }

    async fn update(&self, id: Id, input: &HosterInput) -> DbResult<Hoster> {
        let result = sqlx::query(
            "UPDATE hoster SET name = ?, hoster_type = ?, description = ?, display_order = ?, \
             is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.hoster_type)
        .bind(&input.description)
        .bind(input.display_order)
        .bind(input.is_active)
        .bind(current_timestamp())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error("Hoster", &format!("name '{}'", input.name), e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Hoster", id));
        }

        self.get(id).await
    }

    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM hoster WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(map_read_error)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Hoster", id));
        }

        Ok(())
    }

    async fn reorder(&self, ids: &[Id]) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_read_error)?;
        let now = current_timestamp();

        for (position, id) in ids.iter().enumerate() {
            let result =
                sqlx::query("UPDATE hoster SET display_order = ?, updated_at = ? WHERE id = ?")
                    .bind(position as i64)
                    .bind(&now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_read_error)?;
            if result.rows_affected() == 0 {
                // dropping tx rolls back the positions written so far
                return Err(DbError::not_found("Hoster", id));
            }
        }

        tx.commit().await.map_err(map_read_error)?;
        Ok(())
    }
}
