use crate::AppState;
use crate::api::error::AppError;
use crate::services::retrieval::RetrievalError;
use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{HeaderValue, header},
    response::Response,
};
use tokio_util::io::ReaderStream;
use tower::ServiceExt;
use tower_http::services::ServeFile;

#[utoipa::path(
    get,
    path = "/files/{id}",
    params(
        ("id" = String, Path, description = "Object identifier including extension")
    ),
    responses(
        (status = 200, description = "Object content"),
        (status = 206, description = "Requested byte range"),
        (status = 400, description = "Empty or invalid identifier"),
        (status = 404, description = "No object with this identifier")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let resolved = state.resolver.resolve(&file_id).await?;
    let store = state.resolver.store();

    let mut response = match store.local_path(&resolved.key) {
        // Local files get conditional and range handling from ServeFile
        Some(path) => match ServeFile::new(path).oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        },
        None => {
            let object = store
                .get(&resolved.key)
                .await
                .map_err(RetrievalError::from)?;
            let mut response = Response::new(Body::from_stream(ReaderStream::new(object.reader)));
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from(object.size));
            response
        }
    };

    if response.status().is_success() {
        match HeaderValue::from_str(&resolved.content_type) {
            Ok(value) => {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            Err(e) => tracing::warn!(
                "Unusable content type {:?} for {}: {}",
                resolved.content_type,
                resolved.key,
                e
            ),
        }
    }

    Ok(response)
}

/// `GET /files/` with nothing after the slash.
pub async fn missing_file_id() -> AppError {
    AppError::from(RetrievalError::Empty)
}
