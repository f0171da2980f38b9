use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

/// Crate-level error for wiring and Store B access.
#[derive(Debug, ThisError)]
pub enum SwitchyardError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Provider database not found at {0}")]
    DatabaseMissing(String),
}

impl IntoResponse for SwitchyardError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            SwitchyardError::DatabaseMissing(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorObject {
                    code: "STORE_UNAVAILABLE".to_string(),
                    message: "Provider catalog is not available.".to_string(),
                    details: None,
                },
            ),
            SwitchyardError::DatabaseError(_)
            | SwitchyardError::RactorError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                },
            ),
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Debug, Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
