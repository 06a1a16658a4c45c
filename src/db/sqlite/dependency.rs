//! SQLite DependencyRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{build_limit_offset_clause, build_order_clause, map_read_error, map_write_error};
use crate::db::utils::{current_timestamp, parse_timestamp};
use crate::db::{
    DbError, DbResult, Dependency, DependencyInput, DependencyQuery, DependencyRepository,
    DependencyType, Id, LinkedService, ListResult,
};

const DEPENDENCY_COLUMNS: &str =
    "id, service_id, depends_on_id, label, dependency_type, created_at";

/// SQLx-backed dependency repository.
pub struct SqliteDependencyRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn parse_type(raw: &str) -> DbResult<DependencyType> {
    raw.parse().map_err(|message| DbError::InvalidData {
        message,
        help: "Valid dependency types are required, optional and fallback".to_string(),
    })
}

fn row_to_dependency(row: &SqliteRow) -> DbResult<Dependency> {
    let dependency_type: String = row.get("dependency_type");
    let created_at: String = row.get("created_at");
    Ok(Dependency {
        id: row.get("id"),
        service_id: row.get("service_id"),
        depends_on_id: row.get("depends_on_id"),
        label: row.get("label"),
        dependency_type: parse_type(&dependency_type)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_linked(row: &SqliteRow) -> DbResult<LinkedService> {
    let dependency_type: String = row.get("dependency_type");
    Ok(LinkedService {
        dependency_id: row.get("dependency_id"),
        service_id: row.get("service_id"),
        name: row.get("name"),
        server_id: row.get("server_id"),
        label: row.get("label"),
        dependency_type: parse_type(&dependency_type)?,
    })
}

impl SqliteDependencyRepository<'_> {
    /// Linked services joined on `join_column`, filtered by `filter_column`.
    async fn linked(
        &self,
        service_id: Id,
        filter_column: &str,
        join_column: &str,
    ) -> DbResult<Vec<LinkedService>> {
        let sql = format!(
            "SELECT d.id AS dependency_id, s.id AS service_id, s.name, s.server_id, \
             d.label, d.dependency_type \
             FROM service_dependency d JOIN service s ON s.id = d.{} \
             WHERE d.{} = ? ORDER BY s.name ASC, d.id ASC",
            join_column, filter_column
        );
        let rows = sqlx::query(&sql)
            .bind(service_id)
            .fetch_all(self.pool)
            .await
            .map_err(map_read_error)?;
        rows.iter().map(row_to_linked).collect()
    }
}

impl DependencyRepository for SqliteDependencyRepository<'_> {
    async fn create(&self, input: &DependencyInput) -> DbResult<Dependency> {
        if input.service_id == input.depends_on_id {
            return Err(DbError::Validation {
                message: "A service cannot depend on itself".to_string(),
            });
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO service_dependency (service_id, depends_on_id, label, dependency_type, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(input.service_id)
        .bind(input.depends_on_id)
        .bind(&input.label)
        .bind(input.dependency_type.to_string())
        .bind(current_timestamp())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            map_write_error(
                "Dependency",
                &format!("{} -> {}", input.service_id, input.depends_on_id),
                e,
            )
        })?;

        self.get(id).await
    }

    async fn get(&self, id: Id) -> DbResult<Dependency> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM service_dependency WHERE id = ?",
            DEPENDENCY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(map_read_error)?
        .ok_or_else(|| DbError::not_found("Dependency", id))?;

        row_to_dependency(&row)
    }

    async fn list(&self, query: Option<&DependencyQuery>) -> DbResult<ListResult<Dependency>> {
        let default_query = DependencyQuery::default();
        let query = query.unwrap_or(&default_query);
        let allowed_fields = ["id", "service_id", "dependency_type", "created_at"];

        let order_clause = build_order_clause(&query.page, &allowed_fields, "id");
        let limit_clause = build_limit_offset_clause(&query.page);

        let where_clause = if query.service_id.is_some() {
            "WHERE service_id = ? OR depends_on_id = ?"
        } else {
            ""
        };

        let sql = format!(
            "SELECT {} FROM service_dependency {} {} {}",
            DEPENDENCY_COLUMNS, where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM service_dependency {}", where_clause);

        let mut sql_query = sqlx::query(&sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(service_id) = query.service_id {
            sql_query = sql_query.bind(service_id).bind(service_id);
            count_query = count_query.bind(service_id).bind(service_id);
        }

        let rows = sql_query
            .fetch_all(self.pool)
            .await
            .map_err(map_read_error)?;
        let items = rows
            .iter()
            .map(row_to_dependency)
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

    async fn update(&self, id: Id, input: &DependencyInput) -> DbResult<Dependency> {
        let result =
            sqlx::query("UPDATE service_dependency SET label = ?, dependency_type = ? WHERE id = ?")
                .bind(&input.label)
                .bind(input.dependency_type.to_string())
                .bind(id)
                .execute(self.pool)
                .await
                .map_err(|e| map_write_error("Dependency", &id.to_string(), e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Dependency", id));
        }

        self.get(id).await
    }

    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM service_dependency WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(map_read_error)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Dependency", id));
        }

        Ok(())
    }

    async fn dependencies_of(&self, service_id: Id) -> DbResult<Vec<LinkedService>> {
        self.linked(service_id, "service_id", "depends_on_id").await
    }

    async fn dependents_of(&self, service_id: Id) -> DbResult<Vec<LinkedService>> {
        self.linked(service_id, "depends_on_id", "service_id").await
    }
}
