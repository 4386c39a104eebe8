use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinic_db::StoreError;
use serde_json::json;

/// Error response carrying a generic `{"error": ...}` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Patient not found".to_string(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Map a store failure, logging the cause and keeping it out of the body
    pub fn from_store(err: StoreError, message: &str) -> Self {
        if err.is_not_found() {
            tracing::warn!("⚠ {}: {}", message, err);
            return Self::not_found();
        }
        tracing::error!("✗ {}: {}", message, err);
        Self::internal_error(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("⚠ Rejected request body: {}", rejection.body_text());
        Self {
            status: rejection.status(),
            message: "Invalid patient data".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
