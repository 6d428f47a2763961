use axum::extract::{multipart::MultipartError, Multipart, State};
use axum::Json;
use roster_shared::api::UploadResponse;

use crate::error::AppError;
use crate::media::MediaKind;
use crate::routes::AppState;

struct ImageUpload {
    user_id: i64,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> AppError {
    tracing::debug!("Multipart error: {}", err);
    AppError::Validation("Malformed upload".to_string())
}

async fn read_upload(mut multipart: Multipart, kind: MediaKind) -> Result<ImageUpload, AppError> {
    let mut user_id = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("userId") => {
                let text = field.text().await.map_err(multipart_error)?;
                let id = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::Validation("Invalid userId".to_string()))?;
                user_id = Some(id);
            }
            Some("file") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Body limit of the route is shared by both kinds; enforce the per-kind cap here.
                if bytes.len() > kind.max_bytes() {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File is too large (max {} MB)",
                        kind.max_bytes() / (1024 * 1024)
                    )));
                }
                file = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("userId is required".to_string()))?;
    let (content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    Ok(ImageUpload {
        user_id,
        content_type,
        bytes,
    })
}

async fn handle_upload(
    state: AppState,
    multipart: Multipart,
    kind: MediaKind,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart, kind).await?;

    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(upload.user_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    let url = state
        .media
        .store(
            kind,
            upload.user_id,
            upload.content_type.as_deref(),
            &upload.bytes,
        )
        .await?;

    Ok(Json(UploadResponse { url }))
}

/// POST /api/admin/user/upload
pub async fn upload_avatar(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    handle_upload(state, multipart, MediaKind::Avatar).await
}

/// POST /api/admin/user/banner
pub async fn upload_banner(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    handle_upload(state, multipart, MediaKind::Banner).await
}
