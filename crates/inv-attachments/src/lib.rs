//! # inv-attachments
//!
//! Photo attachment handling for Inventory RS.
//!
//! ## Features
//!
//! - Storage abstraction (local filesystem, in-memory)
//! - Collision-free generated keys, never overwriting an existing object
//! - Path-traversal safe key resolution
//! - Content type and digest recorded per stored photo
//!
//! ## Example
//!
//! ```rust,ignore
//! use inv_attachments::{LocalStorage, PhotoStore, PhotoUpload};
//! use std::sync::Arc;
//!
//! let store = PhotoStore::new(Arc::new(LocalStorage::open("./cache")?));
//! let photo = store.store(PhotoUpload::new(bytes).filename("drill.jpg")).await?;
//! let data = store.retrieve(&photo).await?;
//! ```

pub mod model;
pub mod photo;
pub mod storage;

pub use model::{PhotoUpload, StoredPhoto, DEFAULT_PHOTO_CONTENT_TYPE};
pub use photo::PhotoStore;
pub use storage::{
    calculate_digest, generate_disk_filename, validate_key, FileMetadata, LocalStorage,
    MemoryStorage, Storage, StorageError, StorageResult,
};
