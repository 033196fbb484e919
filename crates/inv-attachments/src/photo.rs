//! Photo store
//!
//! Stores uploaded photos under generated keys and reads them back. Item
//! records only ever hold the returned [`StoredPhoto`] reference.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::model::{PhotoUpload, StoredPhoto};
use crate::storage::{generate_disk_filename, Storage, StorageError, StorageResult};

/// Attempts at finding a free key before giving up
const MAX_KEY_ATTEMPTS: usize = 3;

pub struct PhotoStore<S: Storage + ?Sized> {
    storage: Arc<S>,
}

impl<S: Storage + ?Sized> Clone for PhotoStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<S: Storage + ?Sized> PhotoStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist an upload under a freshly generated key
    #[instrument(skip(self, upload), fields(size = upload.data.len()))]
    pub async fn store(&self, upload: PhotoUpload) -> StorageResult<StoredPhoto> {
        let content_type = upload.resolved_content_type();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let key = generate_disk_filename(upload.filename.as_deref());
            match self.storage.put(&key, upload.data.clone()).await {
                Ok(metadata) => {
                    info!(key = %key, content_type = %content_type, "Photo stored");
                    return Ok(StoredPhoto {
                        key,
                        content_type,
                        size: metadata.size,
                        digest: metadata.digest,
                    });
                }
                Err(StorageError::AlreadyExists(_)) if attempt < MAX_KEY_ATTEMPTS => {
                    warn!(key = %key, "Generated photo key already taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read a stored photo back
    #[instrument(skip(self, photo), fields(key = %photo.key))]
    pub async fn retrieve(&self, photo: &StoredPhoto) -> StorageResult<Bytes> {
        self.storage.get(&photo.key).await
    }

    /// Remove a photo no item refers to any more
    #[instrument(skip(self, photo), fields(key = %photo.key))]
    pub async fn release(&self, photo: &StoredPhoto) -> StorageResult<()> {
        self.storage.delete(&photo.key).await?;
        debug!("Photo released");
        Ok(())
    }
}
