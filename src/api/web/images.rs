//! Service icon uploads.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::api::extract::SessionUser;
use crate::api::{ApiError, AppState};
use crate::db::{Database, Id, NewServiceImage, ServiceImage, ServiceImageRepository};

pub const IMAGE_FIELD: &str = "image";
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
pub const IMAGE_URL_PREFIX: &str = "/uploads/service-images";

#[derive(Debug, Serialize)]
pub struct ServiceImageResponse {
    pub id: Id,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Where the file is served
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<ServiceImage> for ServiceImageResponse {
    fn from(i: ServiceImage) -> Self {
        Self {
            id: i.id,
            url: format!("{}/{}", IMAGE_URL_PREFIX, i.filename),
            filename: i.filename,
            original_name: i.original_name,
            mime_type: i.mime_type,
            size_bytes: i.size_bytes,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub image: ServiceImageResponse,
}

struct Upload {
    original_name: String,
    kind: ImageKind,
    bytes: Vec<u8>,
}

/// Image formats accepted for service icons, recognised by their leading bytes.
///
/// SVG is not accepted: it is served back same-origin and may carry script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Ico,
}

impl ImageKind {
    pub(crate) fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', ..] => Some(Self::Png),
            [0xff, 0xd8, 0xff, ..] => Some(Self::Jpeg),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [0x00, 0x00, 0x01, 0x00, ..] => Some(Self::Ico),
            _ => None,
        }
    }

    pub(crate) fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Ico => "image/x-icon",
        }
    }

    pub(crate) fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Ico => "ico",
        }
    }
}

/// Content-addressed name: sha256 of the bytes plus the extension for the kind.
pub(crate) fn stored_filename(bytes: &[u8], kind: ImageKind) -> String {
    format!("{}.{}", hex::encode(Sha256::digest(bytes)), kind.extension())
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        if bytes.is_empty() {
            return Err(ApiError::Validation("image: file is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::Validation(format!(
                "image: file exceeds {} bytes",
                MAX_IMAGE_BYTES
            )));
        }
        // The declared part type is ignored; only the content decides.
        let kind = ImageKind::sniff(&bytes)
            .ok_or_else(|| ApiError::Validation("image: file must be an image".to_string()))?;
        return Ok(Upload {
            original_name,
            kind,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::Validation(format!(
        "{}: field is required",
        IMAGE_FIELD
    )))
}

/// `POST /service-images`
///
/// Stores the `image` part under the upload directory. Identical uploads
/// share one file and one row.
#[instrument(skip(state, user, multipart))]
pub async fn upload<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let filename = stored_filename(&upload.bytes, upload.kind);

    if let Some(existing) = state.db().service_images().get_by_filename(&filename).await? {
        debug!(%filename, "Image already stored");
        return Ok((
            StatusCode::OK,
            Json(UploadResponse {
                success: true,
                image: existing.into(),
            }),
        ));
    }

    tokio::fs::create_dir_all(state.upload_dir()).await?;
    tokio::fs::write(state.upload_dir().join(&filename), &upload.bytes).await?;

    let image = state
        .db()
        .service_images()
        .create(&NewServiceImage {
            filename,
            original_name: upload.original_name,
            mime_type: upload.kind.mime_type().to_string(),
            size_bytes: upload.bytes.len() as i64,
        })
        .await?;
    debug!(user_id = user.user.id, filename = %image.filename, "Stored service image");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            image: image.into(),
        }),
    ))
}
