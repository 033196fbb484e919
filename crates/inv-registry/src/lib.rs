//! # inv-registry
//!
//! The in-memory item registry and the service that keeps items and their
//! stored photos consistent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use inv_registry::{InventoryService, NewItem, Registry};
//! use inv_attachments::MemoryStorage;
//! use std::sync::Arc;
//!
//! let service = InventoryService::new(
//!     Arc::new(Registry::new()),
//!     Arc::new(MemoryStorage::new()),
//!     Default::default(),
//! );
//! let item = service.register(NewItem::new("Drill"), None).await?;
//! ```

pub mod error;
pub mod model;
pub mod registry;
pub mod service;

pub use error::{InventoryError, InventoryResult};
pub use model::{Item, ItemChanges, NewItem};
pub use registry::{Registry, RegistryState};
pub use service::{InventoryConfig, InventoryService, SearchSummary};
