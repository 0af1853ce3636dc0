//! Maps [`CoreError`] onto HTTP responses (spec §7). Handlers return
//! `Result<_, ApiError>` and propagate with `?`; the `From` impl below
//! does the classification once, in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mygitpanel_core::CoreError;
use serde_json::json;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::UpstreamConflict => StatusCode::CONFLICT,
            CoreError::CredentialsNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::UpstreamTransient(_) => StatusCode::BAD_GATEWAY,
            CoreError::Config(_) | CoreError::Store(_) => {
                log::error!("internal error serving request: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
