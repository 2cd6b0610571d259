pub mod files;
pub mod health;
pub mod upload;

use axum::http::StatusCode;

/// Answers pre-flight requests that get past the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
