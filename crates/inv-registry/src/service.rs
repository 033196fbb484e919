//! Inventory service
//!
//! Keeps item records and their stored photos consistent. Photo bytes are
//! written before the registry lock is taken; a stored photo that ends up
//! unreferenced because the registry rejected the change is released again.

use std::sync::Arc;

use bytes::Bytes;
use inv_attachments::{PhotoStore, PhotoUpload, Storage, StorageError, StoredPhoto};
use inv_core::{Id, ValidationErrors};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{InventoryError, InventoryResult};
use crate::model::{Item, ItemChanges, NewItem};
use crate::registry::Registry;

/// Inventory service configuration
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Delete a photo once no item refers to it
    pub reclaim_orphaned_photos: bool,
    /// Origin prepended to photo paths in search results, e.g. `http://localhost:3000`
    pub public_origin: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            reclaim_orphaned_photos: true,
            public_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// Result of a search by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    pub id: Id,
    pub name: String,
    pub description: String,
}

pub struct InventoryService<S: Storage + ?Sized> {
    registry: Arc<Registry>,
    photos: PhotoStore<S>,
    config: InventoryConfig,
}

impl<S: Storage + ?Sized> InventoryService<S> {
    pub fn new(registry: Arc<Registry>, storage: Arc<S>, config: InventoryConfig) -> Self {
        Self {
            registry,
            photos: PhotoStore::new(storage),
            config,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn photos(&self) -> &PhotoStore<S> {
        &self.photos
    }

    /// Register an item, storing its photo first when one was uploaded
    #[instrument(skip_all, fields(has_photo = photo.is_some()))]
    pub async fn register(
        &self,
        new_item: NewItem,
        photo: Option<PhotoUpload>,
    ) -> InventoryResult<Item> {
        // Reject before anything reaches the disk
        Registry::validate(&new_item)?;

        let stored = match photo {
            Some(upload) => Some(self.photos.store(upload).await?),
            None => None,
        };

        match self.registry.register(new_item, stored.clone()).await {
            Ok(item) => {
                info!(id = item.id, name = %item.name, "Item registered");
                Ok(item)
            }
            Err(e) => {
                if let Some(photo) = &stored {
                    self.discard(photo).await;
                }
                Err(e)
            }
        }
    }

    pub async fn list(&self) -> Vec<Item> {
        self.registry.list_all().await
    }

    pub async fn get(&self, id: Id) -> InventoryResult<Item> {
        self.registry.get(id).await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_fields(&self, id: Id, changes: ItemChanges) -> InventoryResult<Item> {
        let item = self.registry.update_fields(id, changes).await?;
        info!(id = id, "Item updated");
        Ok(item)
    }

    /// Fetch an item's photo metadata and bytes
    #[instrument(skip(self))]
    pub async fn photo(&self, id: Id) -> InventoryResult<(StoredPhoto, Bytes)> {
        let item = self.registry.get(id).await?;
        let photo = item.photo.ok_or(InventoryError::PhotoNotFound(id))?;

        match self.photos.retrieve(&photo).await {
            Ok(data) => Ok((photo, data)),
            Err(StorageError::NotFound(_)) | Err(StorageError::InvalidPath(_)) => {
                warn!(id = id, key = %photo.key, "Photo referenced by item is missing from storage");
                Err(InventoryError::PhotoNotFound(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store a new photo for an item and release the one it replaces
    #[instrument(skip(self, upload), fields(has_photo = upload.is_some()))]
    pub async fn replace_photo(&self, id: Id, upload: Option<PhotoUpload>) -> InventoryResult<Item> {
        // Unknown ids never cause a write to storage
        self.registry.get(id).await?;

        let upload = upload.ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.add_base("photo is required");
            InventoryError::Validation(errors)
        })?;

        let stored = self.photos.store(upload).await?;

        let previous = match self.registry.replace_photo(id, stored.clone()).await {
            Ok(previous) => previous,
            Err(e) => {
                self.discard(&stored).await;
                return Err(e);
            }
        };

        info!(id = id, key = %stored.key, "Item photo replaced");

        if let Some(old) = previous {
            self.reclaim(&old).await;
        }

        self.registry.get(id).await
    }

    /// Remove an item and release its photo
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Id) -> InventoryResult<Item> {
        let item = self.registry.delete(id).await?;
        info!(id = id, "Item deleted");

        if let Some(photo) = &item.photo {
            self.reclaim(photo).await;
        }

        Ok(item)
    }

    /// Summarise an item, optionally appending the absolute photo URL
    pub async fn search(&self, id: Id, include_photo: bool) -> InventoryResult<SearchSummary> {
        let item = self.registry.get(id).await?;

        let mut description = item.description.clone();
        if include_photo {
            if let Some(path) = item.photo_path() {
                description.push_str(&format!(" | Photo: {}{}", self.config.public_origin, path));
            }
        }

        Ok(SearchSummary {
            id: item.id,
            name: item.name,
            description,
        })
    }

    /// Release a photo that lost its last reference, when reclamation is on
    async fn reclaim(&self, photo: &StoredPhoto) {
        if self.config.reclaim_orphaned_photos {
            self.discard(photo).await;
        }
    }

    async fn discard(&self, photo: &StoredPhoto) {
        if let Err(e) = self.photos.release(photo).await {
            warn!(key = %photo.key, error = %e, "Failed to release photo");
        }
    }
}
