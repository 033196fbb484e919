//! # inv-api
//!
//! REST handlers for Inventory RS: item registration, listing, updates,
//! photo upload/download and search, with JSON error envelopes.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod representers;
pub mod routes;

pub use extractors::AppState;
pub use routes::{app, router, with_fallback};
