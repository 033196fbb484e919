//! API request handlers

pub mod inventory;
pub mod search;

use crate::error::ApiError;

/// Catch-all for unknown routes and unsupported methods
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
