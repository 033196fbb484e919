//! JSON representations returned to clients
//!
//! Stored photo keys never leave the server; clients only see the photo path.

use inv_core::Id;
use inv_registry::Item;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub photo_url: Option<String>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            photo_url: item.photo_path(),
            id: item.id,
            name: item.name,
            description: item.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}
