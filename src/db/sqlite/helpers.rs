//! Shared helper functions for SQLite repositories.

use crate::db::{DbError, PageSort, SortOrder};

/// Validate and map a sort field to the actual column name.
/// Returns None for invalid fields (falls back to default).
pub fn validate_sort_field(field: &str, allowed: &[&str]) -> Option<&'static str> {
    for &allowed_field in allowed {
        if field == allowed_field {
            // Return static str to avoid lifetime issues
            return match field {
                "id" => Some("id"),
                "name" => Some("name"),
                "ip" => Some("ip"),
                "hoster" => Some("hoster"),
                "location" => Some("location"),
                "server_id" => Some("server_id"),
                "service_id" => Some("service_id"),
                "dependency_type" => Some("dependency_type"),
                "last_maintenance_at" => Some("last_maintenance_at"),
                "created_at" => Some("created_at"),
                "updated_at" => Some("updated_at"),
                _ => None,
            };
        }
    }
    None
}

/// Build ORDER BY clause from PageSort parameters.
pub fn build_order_clause(page: &PageSort, allowed_fields: &[&str], default_field: &str) -> String {
    let sort_field = page
        .sort_by
        .as_deref()
        .and_then(|f| validate_sort_field(f, allowed_fields))
        .unwrap_or(default_field);

    let order = match page.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    // id as tiebreaker keeps pagination stable
    if sort_field == "id" {
        format!("ORDER BY id {}", order)
    } else {
        format!("ORDER BY {} {}, id ASC", sort_field, order)
    }
}

/// SQLite integers are signed 64-bit; anything larger is clamped.
fn sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Build LIMIT/OFFSET clause from PageSort parameters.
/// Note: SQL requires LIMIT when using OFFSET. If offset is provided without limit,
/// we use LIMIT -1 (SQLite's "no limit" value).
pub fn build_limit_offset_clause(page: &PageSort) -> String {
    let mut clause = String::new();

    let offset = page.offset.filter(|o| *o > 0).map(sql_int);

    if let Some(limit) = page.limit.map(sql_int) {
        clause.push_str(&format!(" LIMIT {}", limit));
    } else if offset.is_some() {
        clause.push_str(" LIMIT -1");
    }

    if let Some(offset) = offset {
        clause.push_str(&format!(" OFFSET {}", offset));
    }

    clause
}

/// Wrap a search term for a `LIKE` comparison, escaping wildcards.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped.to_lowercase())
}

/// Map a sqlx error to a [`DbError`], classifying constraint failures.
///
/// `entity_type` and `key` describe what was being written so uniqueness
/// conflicts produce a readable message.
pub fn map_write_error(entity_type: &str, key: &str, e: sqlx::Error) -> DbError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return DbError::AlreadyExists {
                entity_type: entity_type.to_string(),
                key: key.to_string(),
            };
        }
        if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
            return DbError::Constraint {
                message: db_err.message().to_string(),
            };
        }
    }
    DbError::Database {
        message: e.to_string(),
    }
}

/// Map a sqlx error from a read query.
pub fn map_read_error(e: sqlx::Error) -> DbError {
    DbError::Database {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_clause_falls_back_to_default_for_unknown_field() {
        let page = PageSort {
            sort_by: Some("password".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_order_clause(&page, &["name"], "created_at"),
            "ORDER BY created_at ASC, id ASC"
        );
    }

    #[test]
    fn order_clause_honours_allowed_field_and_direction() {
        let page = PageSort {
            sort_by: Some("name".to_string()),
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        };
        assert_eq!(
            build_order_clause(&page, &["name"], "created_at"),
            "ORDER BY name DESC, id ASC"
        );
    }

    #[test]
    fn field_not_in_allow_list_is_ignored() {
        // "ip" is a known column but not allowed for this entity
        let page = PageSort {
            sort_by: Some("ip".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_order_clause(&page, &["name"], "name"),
            "ORDER BY name ASC, id ASC"
        );
    }

    #[test]
    fn limit_offset_clause() {
        let page = PageSort {
            limit: Some(10),
            offset: Some(20),
            ..Default::default()
        };
        assert_eq!(build_limit_offset_clause(&page), " LIMIT 10 OFFSET 20");
    }

    #[test]
    fn offset_without_limit_uses_sqlite_no_limit() {
        let page = PageSort {
            offset: Some(5),
            ..Default::default()
        };
        assert_eq!(build_limit_offset_clause(&page), " LIMIT -1 OFFSET 5");
    }

    #[test]
    fn zero_offset_is_omitted() {
        let page = PageSort {
            limit: Some(3),
            offset: Some(0),
            ..Default::default()
        };
        assert_eq!(build_limit_offset_clause(&page), " LIMIT 3");
    }

    #[test]
    fn oversized_offset_is_clamped_to_sqlite_range() {
        let page = PageSort {
            limit: Some(usize::MAX),
            offset: Some(usize::MAX),
            ..Default::default()
        };
        assert_eq!(
            build_limit_offset_clause(&page),
            format!(" LIMIT {} OFFSET {}", i64::MAX, i64::MAX)
        );
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Web_01%"), "%web\\_01\\%%");
    }
}
