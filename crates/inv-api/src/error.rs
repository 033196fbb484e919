//! API error handling
//!
//! Every failure is rendered as `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inv_registry::InventoryError;
use serde::Serialize;
use tracing::error;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    PayloadTooLarge(String),
    MethodNotAllowed,
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    /// Map an axum extractor rejection, keeping its status class
    pub fn rejected(status: StatusCode, body_text: String) -> Self {
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(body_text),
            s if s.is_server_error() => ApiError::Internal(body_text),
            _ => ApiError::BadRequest(body_text),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NotFound => "Not found".into(),
            ApiError::BadRequest(msg) | ApiError::PayloadTooLarge(msg) => msg.clone(),
            ApiError::MethodNotAllowed => "Method Not Allowed".into(),
            ApiError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(_) | InventoryError::PhotoNotFound(_) => ApiError::NotFound,
            InventoryError::Validation(errors) => {
                ApiError::BadRequest(errors.full_messages().join(", "))
            }
            InventoryError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(detail) = &self {
            error!(detail = %detail, "Request failed");
        }

        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use inv_core::ValidationErrors;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(InventoryError::NotFound(1)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(InventoryError::PhotoNotFound(1)).status_code(),
            StatusCode::NOT_FOUND
        );

        let validation = ApiError::from(InventoryError::Validation(ValidationErrors::field(
            "inventory_name",
            "is required",
        )));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.message(), "inventory_name is required");

        let storage = ApiError::from(InventoryError::Storage(
            inv_attachments::StorageError::InvalidPath("..".into()),
        ));
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.message(), "Internal server error");
    }

    #[test]
    fn test_rejected() {
        assert!(matches!(
            ApiError::rejected(StatusCode::PAYLOAD_TOO_LARGE, "too big".into()),
            ApiError::PayloadTooLarge(_)
        ));
        assert!(matches!(
            ApiError::rejected(StatusCode::UNSUPPORTED_MEDIA_TYPE, "nope".into()),
            ApiError::BadRequest(_)
        ));
    }
}
