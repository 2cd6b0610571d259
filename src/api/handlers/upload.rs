use crate::AppState;
use crate::api::error::AppError;
use crate::models::UploadResult;
use crate::services::spool::{SpooledUpload, Spooler};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header},
};
use futures::TryStreamExt;
use utoipa::ToSchema;

const SINGLE_FIELD: &str = "file";
const BATCH_FIELD: &str = "files";

/// Multipart body of `POST /upload`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Multipart body of `POST /uploads`; `files` may repeat
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct BatchUploadForm {
    #[schema(value_type = Vec<String>)]
    pub files: Vec<Vec<u8>>,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File processed", body = UploadResult),
        (status = 400, description = "Missing file field or body too large")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResult>, AppError> {
    let uploads = read_uploads(&state, &headers, multipart, SINGLE_FIELD).await?;
    let upload = uploads
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("Invalid file".to_string()))?;

    let host = request_host(&state, &headers);
    Ok(Json(state.uploads.process(&upload, &host).await))
}

#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content = BatchUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "One result per submitted file, in order", body = [UploadResult]),
        (status = 400, description = "Invalid form or body too large")
    ),
    tag = "files"
)]
pub async fn upload_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<UploadResult>>, AppError> {
    let uploads = read_uploads(&state, &headers, multipart, BATCH_FIELD).await?;
    tracing::info!("Processing batch of {} file(s)", uploads.len());

    let host = request_host(&state, &headers);
    Ok(Json(state.uploads.process_batch(&uploads, &host).await))
}

/// Spools every file part named `field_name`. Nothing is stored until the
/// whole body has been read, so a rejected body leaves no objects behind.
async fn read_uploads(
    state: &AppState,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> Result<Vec<SpooledUpload>, AppError> {
    let limit = state.config.max_upload_size;
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(AppError::BadRequest("File too large".to_string()));
    }

    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut spooler = Spooler::new(&state.config.spool_dir, limit);
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_body_error(&multipart_error_text(&e)))?
    {
        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty() && field.name() == Some(field_name))
            .map(str::to_string);

        match file_name {
            Some(name) => {
                let body = field.map_err(|e| multipart_error_text(&e));
                uploads.push(spooler.spool(name, body).await?);
            }
            None => spooler.skip(field.map_err(|e| multipart_error_text(&e))).await?,
        }
    }

    Ok(uploads)
}

/// The body limit surfaces as a 413 status inside the multipart error.
fn multipart_error_text(err: &MultipartError) -> String {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "length limit exceeded".to_string()
    } else {
        err.body_text()
    }
}

fn request_host(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.bind_addr.to_string())
}
