//! SQLite ServiceRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{
    build_limit_offset_clause, build_order_clause, like_pattern, map_read_error, map_write_error,
};
use crate::db::utils::{current_timestamp, format_timestamp, parse_optional_timestamp, parse_timestamp};
use crate::db::{
    DbError, DbResult, Id, ListResult, Service, ServiceInput, ServicePort, ServiceQuery,
    ServiceRepository,
};

const SERVICE_COLUMNS: &str = "id, server_id, name, icon, path, repo_url, doc_path, ports, \
     last_maintenance_at, color, note, created_at, updated_at";

/// SQLx-backed service repository.
pub struct SqliteServiceRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn row_to_service(row: &SqliteRow) -> DbResult<Service> {
    let ports_json: String = row.get("ports");
    let ports: Vec<ServicePort> =
        serde_json::from_str(&ports_json).map_err(|e| DbError::InvalidData {
            message: format!("Malformed ports column: {}", e),
            help: "Ports are stored as a JSON array of {port, label} objects".to_string(),
        })?;
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Service {
        id: row.get("id"),
        server_id: row.get("server_id"),
        name: row.get("name"),
        icon: row.get("icon"),
        path: row.get("path"),
        repo_url: row.get("repo_url"),
        doc_path: row.get("doc_path"),
        ports,
        last_maintenance_at: parse_optional_timestamp(row.get("last_maintenance_at"))?,
        color: row.get("color"),
        note: row.get("note"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn ports_to_json(ports: &[ServicePort]) -> DbResult<String> {
    serde_json::to_string(ports).map_err(|e| DbError::InvalidData {
        message: e.to_string(),
        help: "Ports must serialize to JSON".to_string(),
    })
}

fn write_error_key(input: &ServiceInput) -> String {
    format!("name '{}' on server {}", input.name, input.server_id)
}

impl ServiceRepository for SqliteServiceRepository<'_> {
    async fn create(&self, input: &ServiceInput) -> DbResult<Service> {
        let now = current_timestamp();
        let ports = ports_to_json(&input.ports)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO service (server_id, name, icon, path, repo_url, doc_path, ports, \
             last_maintenance_at, color, note, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(input.server_id)
        .bind(&input.name)
        .bind(&input.icon)
        .bind(&input.path)
        .bind(&input.repo_url)
        .bind(&input.doc_path)
        .bind(&ports)
        .bind(input.last_maintenance_at.as_ref().map(format_timestamp))
        .bind(&input.color)
        .bind(&input.note)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("Service", &write_error_key(input), e))?;

        self.get(id).await
    }

    async fn get(&self, id: Id) -> DbResult<Service> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM service WHERE id = ?",
            SERVICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(map_read_error)?
        .ok_or_else(|| DbError::not_found("Service", id))?;

        row_to_service(&row)
    }

    async fn list(&self, query: Option<&ServiceQuery>) -> DbResult<ListResult<Service>> {
        let default_query = ServiceQuery::default();
        let query = query.unwrap_or(&default_query);
        let allowed_fields = [
            "id",
            "name",
            "server_id",
            "last_maintenance_at",
            "created_at",
            "updated_at",
        ];

        let order_clause = build_order_clause(&query.page, &allowed_fields, "name");
        let limit_clause = build_limit_offset_clause(&query.page);

        let mut conditions: Vec<&str> = vec![];
        if query.server_id.is_some() {
            conditions.push("server_id = ?");
        }
        let pattern = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(like_pattern);
        if pattern.is_some() {
            conditions.push(
                "(lower(name) LIKE ? ESCAPE '\\' OR lower(coalesce(path, '')) LIKE ? ESCAPE '\\' \
                 OR lower(coalesce(note, '')) LIKE ? ESCAPE '\\')",
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM service {} {} {}",
            SERVICE_COLUMNS, where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM service {}", where_clause);

        let mut sql_query = sqlx::query(&sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(server_id) = query.server_id {
            sql_query = sql_query.bind(server_id);
            count_query = count_query.bind(server_id);
        }
        if let Some(pattern) = &pattern {
            // one bind per LIKE placeholder
            for _ in 0..3 {
                sql_query = sql_query.bind(pattern);
                count_query = count_query.bind(pattern);
            }
        }

        let rows = sql_query
            .fetch_all(self.pool)
            .await
            .map_err(map_read_error)?;
        let items = rows
            .iter()
            .map(row_to_service)
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

    async fn update(&self, id: Id, input: &ServiceInput) -> DbResult<Service> {
        let ports = ports_to_json(&input.ports)?;

        let result = sqlx::query(
            "UPDATE service SET server_id = ?, name = ?, icon = ?, path = ?, repo_url = ?, \
             doc_path = ?, ports = ?, last_maintenance_at = ?, color = ?, note = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(input.server_id)
        .bind(&input.name)
        .bind(&input.icon)
        .bind(&input.path)
        .bind(&input.repo_url)
        .bind(&input.doc_path)
        .bind(&ports)
        .bind(input.last_maintenance_at.as_ref().map(format_timestamp))
        .bind(&input.color)
        .bind(&input.note)
        .bind(current_timestamp())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error("Service", &write_error_key(input), e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        self.get(id).await
    }

    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM service WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error("Service", &id.to_string(), e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        Ok(())
    }

    async fn mark_maintained(&self, id: Id) -> DbResult<Service> {
        let now = current_timestamp();
        let result =
            sqlx::query("UPDATE service SET last_maintenance_at = ?, updated_at = ? WHERE id = ?")
                .bind(&now)
                .bind(&now)
                .bind(id)
                .execute(self.pool)
                .await
                .map_err(map_read_error)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        self.get(id).await
    }

    async fn recently_maintained(&self, limit: usize) -> DbResult<Vec<Service>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM service \
             ORDER BY last_maintenance_at IS NULL, last_maintenance_at DESC, id ASC LIMIT ?",
            SERVICE_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await
        .map_err(map_read_error)?;

        rows.iter().map(row_to_service).collect()
    }

    async fn count(&self) -> DbResult<usize> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service")
            .fetch_one(self.pool)
            .await
            .map_err(map_read_error)?;
        Ok(total as usize)
    }
}
