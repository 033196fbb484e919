//! Item registry
//!
//! The authoritative in-memory collection of items. All mutations go through
//! one write guard, so id assignment and insertion are atomic with respect to
//! each other; reads share the lock and see the last completed write.

use inv_attachments::StoredPhoto;
use inv_core::{Id, ValidationErrors};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::{InventoryError, InventoryResult};
use crate::model::{Item, ItemChanges, NewItem};

/// Items in registration order plus the id counter
#[derive(Debug)]
pub struct RegistryState {
    items: Vec<Item>,
    next_id: Id,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }
}

impl RegistryState {
    fn position(&self, id: Id) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn find_mut(&mut self, id: Id) -> InventoryResult<&mut Item> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(InventoryError::NotFound(id))
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the fields required for registration
    pub fn validate(new_item: &NewItem) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if new_item.name.as_deref().map_or(true, str::is_empty) {
            errors.add("inventory_name", "is required");
        }
        errors.into_result()
    }

    /// Register an item under the next unused id
    #[instrument(skip(self, new_item, photo), fields(has_photo = photo.is_some()))]
    pub async fn register(
        &self,
        new_item: NewItem,
        photo: Option<StoredPhoto>,
    ) -> InventoryResult<Item> {
        Self::validate(&new_item)?;

        let mut state = self.state.write().await;
        let id = state.next_id;
        state.next_id += 1;

        let item = Item {
            id,
            name: new_item.name.unwrap_or_default(),
            description: new_item.description.unwrap_or_default(),
            photo,
        };
        state.items.push(item.clone());

        debug!(id = id, "Item registered");
        Ok(item)
    }

    /// Snapshot of every item in registration order
    pub async fn list_all(&self) -> Vec<Item> {
        self.state.read().await.items.clone()
    }

    pub async fn get(&self, id: Id) -> InventoryResult<Item> {
        let state = self.state.read().await;
        state
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(InventoryError::NotFound(id))
    }

    /// Apply the supplied fields, leaving omitted ones untouched
    #[instrument(skip(self, changes))]
    pub async fn update_fields(&self, id: Id, changes: ItemChanges) -> InventoryResult<Item> {
        let mut state = self.state.write().await;
        let item = state.find_mut(id)?;
        changes.apply(item);
        Ok(item.clone())
    }

    /// Point the item at a new photo, handing back the one it replaced
    #[instrument(skip(self, photo), fields(key = %photo.key))]
    pub async fn replace_photo(
        &self,
        id: Id,
        photo: StoredPhoto,
    ) -> InventoryResult<Option<StoredPhoto>> {
        let mut state = self.state.write().await;
        let item = state.find_mut(id)?;
        Ok(item.photo.replace(photo))
    }

    /// Remove an item, returning it so its photo can be released
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Id) -> InventoryResult<Item> {
        let mut state = self.state.write().await;
        let index = state.position(id).ok_or(InventoryError::NotFound(id))?;
        Ok(state.items.remove(index))
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }
}
