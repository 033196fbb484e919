//! Item model

use inv_attachments::StoredPhoto;
use inv_core::Id;
use serde::{Deserialize, Serialize};

/// A registered inventory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Id,
    pub name: String,
    pub description: String,
    /// Weak reference into the photo store
    pub photo: Option<StoredPhoto>,
}

impl Item {
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    /// Public path of the photo resource, if the item has one
    pub fn photo_path(&self) -> Option<String> {
        self.photo
            .as_ref()
            .map(|_| format!("/inventory/{}/photo", self.id))
    }
}

/// Parameters for registering an item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItem {
    #[serde(default, rename = "inventory_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of an item's text fields.
///
/// `None` means the field was not sent and stays unchanged; `Some("")`
/// is an explicit update to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ItemChanges {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub(crate) fn apply(self, item: &mut Item) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
    }
}
