//! # inv-core
//!
//! Core types and utilities shared by every Inventory RS crate:
//! - Item identifier type
//! - Validation error collection
//! - Application configuration

pub mod config;
pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
