//! Registry and service errors

use inv_attachments::StorageError;
use inv_core::{Id, ValidationErrors};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Item not found: {0}")]
    NotFound(Id),
    #[error("Item {0} has no photo")]
    PhotoNotFound(Id),
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type InventoryResult<T> = Result<T, InventoryError>;
