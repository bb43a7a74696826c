//! Mapping of lifecycle failures onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use campusfix::LifecycleError;

/// A [`LifecycleError`] on its way out as `{"detail": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError(pub LifecycleError);

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LifecycleError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LifecycleError::Forbidden(_) => StatusCode::FORBIDDEN,
            LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
            LifecycleError::Validation(_) | LifecycleError::InvalidState(_) => StatusCode::BAD_REQUEST,
            LifecycleError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LifecycleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self.0 {
            LifecycleError::Storage(e) => {
                tracing::error!("Storage failure: {:?}", e);
                "internal storage error".to_string()
            }
            other => {
                tracing::debug!(kind = other.kind(), "request rejected: {}", other);
                other.to_string()
            }
        };

        let body = Json(serde_json::json!({
            "detail": detail,
            "kind": self.0.kind(),
        }));
        (status, body).into_response()
    }
}
