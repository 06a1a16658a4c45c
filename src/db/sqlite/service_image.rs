//! SQLite ServiceImageRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{map_read_error, map_write_error};
use crate::db::utils::{current_timestamp, parse_timestamp};
use crate::db::{DbResult, NewServiceImage, ServiceImage, ServiceImageRepository};

const IMAGE_COLUMNS: &str = "id, filename, original_name, mime_type, size_bytes, created_at";

pub struct SqliteServiceImageRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn row_to_image(row: &SqliteRow) -> DbResult<ServiceImage> {
    let created_at: String = row.get("created_at");
    Ok(ServiceImage {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        mime_type: row.get("mime_type"),
        size_bytes: row.get("size_bytes"),
        created_at: parse_timestamp(&created_at)?,
    })
}

impl ServiceImageRepository for SqliteServiceImageRepository<'_> {
    async fn create(&self, image: &NewServiceImage) -> DbResult<ServiceImage> {
        let row = sqlx::query(&format!(
            "INSERT INTO service_image (filename, original_name, mime_type, size_bytes, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(&image.filename)
        .bind(&image.original_name)
        .bind(&image.mime_type)
        .bind(image.size_bytes)
        .bind(current_timestamp())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("ServiceImage", &image.filename, e))?;

        row_to_image(&row)
    }

    async fn get_by_filename(&self, filename: &str) -> DbResult<Option<ServiceImage>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM service_image WHERE filename = ?",
            IMAGE_COLUMNS
        ))
        .bind(filename)
        .fetch_optional(self.pool)
        .await
        .map_err(map_read_error)?;

        row.as_ref().map(row_to_image).transpose()
    }

    async fn list(&self) -> DbResult<Vec<ServiceImage>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM service_image ORDER BY created_at DESC, id DESC",
            IMAGE_COLUMNS
        ))
        .fetch_all(self.pool)
        .await
        .map_err(map_read_error)?;

        rows.iter().map(row_to_image).collect()
    }
}
