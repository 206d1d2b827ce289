//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must
//! implement, so the question processor can work against any backend (or a
//! test fake) without coupling to implementation details.

use async_trait::async_trait;
use imgrate_core::{AppError, StorageBackend};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed for key {key}: {message}")]
    UploadFailed { key: String, message: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Storage abstraction trait
///
/// Uploads are single-attempt: a failed document is retried by the next
/// batch run, not by the backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` under `key` and return the public URL.
    ///
    /// When `content_type` is absent it is derived from the key's
    /// extension (defaulting to `image/png`). The returned URL is
    /// deterministic: the same key always yields the same URL.
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
