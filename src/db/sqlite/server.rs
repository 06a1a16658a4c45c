//! SQLite ServerRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{
    build_limit_offset_clause, build_order_clause, like_pattern, map_read_error, map_write_error,
};
use crate::db::utils::{current_timestamp, parse_timestamp};
use crate::db::{
    DbError, DbResult, Id, ListResult, Server, ServerInput, ServerQuery, ServerRepository,
};

const SERVER_COLUMNS: &str =
    "id, name, ip, hoster, location, parent_id, color, note, created_at, updated_at";

/// SQLx-backed server repository.
pub struct SqliteServerRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn row_to_server(row: &SqliteRow) -> DbResult<Server> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(Server {
        id: row.get("id"),
        name: row.get("name"),
        ip: row.get("ip"),
        hoster: row.get("hoster"),
        location: row.get("location"),
        parent_id: row.get("parent_id"),
        color: row.get("color"),
        note: row.get("note"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

impl SqliteServerRepository<'_> {
    /// Reject a parent that is missing or is the server itself.
    async fn check_parent(&self, id: Option<Id>, parent_id: Option<Id>) -> DbResult<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        if Some(parent_id) == id {
            return Err(DbError::Validation {
                message: "A server cannot be its own parent".to_string(),
            });
        }
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM server WHERE id = ?")
            .bind(parent_id)
            .fetch_optional(self.pool)
            .await
            .map_err(map_read_error)?;
        if exists.is_none() {
            return Err(DbError::Validation {
                message: format!("Parent server {} does not exist", parent_id),
            });
        }
        Ok(())
    }
}

impl ServerRepository for SqliteServerRepository<'_> {
    async fn create(&self, input: &ServerInput) -> DbResult<Server> {
        self.check_parent(None, input.parent_id).await?;

        let now = current_timestamp();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO server (name, ip, hoster, location, parent_id, color, note, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.ip)
        .bind(&input.hoster)
        .bind(&input.location)
        .bind(input.parent_id)
        .bind(&input.color)
        .bind(&input.note)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("Server", &format!("name '{}'", input.name), e))?;

        self.get(id).await
    }

    async fn get(&self, id: Id) -> DbResult<Server> {
        let row = sqlx::query(&format!("SELECT {} FROM server WHERE id = ?", SERVER_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(map_read_error)?
            .ok_or_else(|| DbError::not_found("Server", id))?;

        row_to_server(&row)
    }

    async fn list(&self, query: Option<&ServerQuery>) -> DbResult<ListResult<Server>> {
        let default_query = ServerQuery::default();
        let query = query.unwrap_or(&default_query);
        let allowed_fields = ["id", "name", "ip", "hoster", "location", "created_at", "updated_at"];

        let order_clause = build_order_clause(&query.page, &allowed_fields, "name");
        let limit_clause = build_limit_offset_clause(&query.page);

        let mut conditions: Vec<&str> = vec![];
        let mut text_binds: Vec<String> = vec![];
        let mut id_binds: Vec<i64> = vec![];

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            conditions.push(
                "(lower(name) LIKE ? ESCAPE '\\' OR lower(coalesce(ip, '')) LIKE ? ESCAPE '\\' \
                 OR lower(coalesce(location, '')) LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(q);
            text_binds.extend([pattern.clone(), pattern.clone(), pattern]);
        }
        if let Some(hoster) = &query.hoster {
            conditions.push("hoster = ?");
            text_binds.push(hoster.clone());
        }
        if let Some(parent_id) = query.parent_id {
            conditions.push("parent_id = ?");
            id_binds.push(parent_id);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM server {} {} {}",
            SERVER_COLUMNS, where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM server {}", where_clause);

        // Text conditions always precede id conditions in the WHERE clause
        let mut sql_query = sqlx::query(&sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in &text_binds {
            sql_query = sql_query.bind(value);
            count_query = count_query.bind(value);
        }
        for value in &id_binds {
            sql_query = sql_query.bind(value);
            count_query = count_query.bind(value);
        }

        let rows = sql_query
            .fetch_all(self.pool)
            .await
            .map_err(map_read_error)?;
        let items = rows
            .iter()
            .map(row_to_server)
            .collect::<DbResult<Vec<_>>>()?;

        let total = count_query
            .fetch_one(self.pool)
            .await
            .map_err(map_read_error)?;

        Ok(ListResult {
            items,
            total: total as usize,
            limit: query.page.limit,
            offset: query.page.offset.unwrap_or(0),
        })
    }

    async fn update(&self, id: Id, input: &ServerInput) -> DbResult<Server> {
        self.check_parent(Some(id), input.parent_id).await?;

        let result = sqlx::query(
            "UPDATE server SET name = ?, ip = ?, hoster = ?, location = ?, parent_id = ?, \
             color = ?, note = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.ip)
        .bind(&input.hoster)
        .bind(&input.location)
        .bind(input.parent_id)
        .bind(&input.color)
        .bind(&input.note)
        .bind(current_timestamp())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error("Server", &format!("name '{}'", input.name), e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Server", id));
        }

        self.get(id).await
    }

    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM server WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error("Server", &id.to_string(), e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Server", id));
        }

        Ok(())
    }

    async fn count(&self) -> DbResult<usize> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM server")
            .fetch_one(self.pool)
            .await
            .map_err(map_read_error)?;
        Ok(total as usize)
    }
}
