use crate::services::retrieval::RetrievalError;
use crate::services::spool::SpoolError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Body-level failures mention the size ceiling when that is what tripped.
    pub fn from_body_error(message: &str) -> Self {
        if message.contains("length limit") {
            AppError::BadRequest("File too large".to_string())
        } else {
            AppError::BadRequest(format!("Invalid multipart form: {}", message))
        }
    }
}

impl From<SpoolError> for AppError {
    fn from(err: SpoolError) -> Self {
        match err {
            SpoolError::TooLarge => AppError::BadRequest(err.to_string()),
            SpoolError::Body(msg) => AppError::from_body_error(&msg),
            SpoolError::Io(e) => AppError::Internal(format!("Spool error: {}", e)),
        }
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Empty | RetrievalError::InvalidKey(_) => {
                AppError::BadRequest(err.to_string())
            }
            RetrievalError::NotFound => AppError::NotFound(err.to_string()),
            RetrievalError::Storage(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
