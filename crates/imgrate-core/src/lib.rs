//! Imgrate Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! media-type helpers shared across all imgrate components.

pub mod config;
pub mod error;
pub mod media_type;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::AppError;
pub use media_type::{extension_for, mime_for_key};
pub use storage_types::StorageBackend;
