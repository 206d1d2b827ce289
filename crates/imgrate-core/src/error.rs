//! Error types module
//!
//! All errors are unified under the `AppError` enum, which can represent
//! database, storage, fetch, and markup errors as well as the identifier
//! validation failures raised before any document is touched.
//!
//! Per-image errors (fetch, upload, markup) are caught at the question
//! processor boundary and converted into a document-level failure outcome;
//! they never abort a batch run.

use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Markup error: {0}")]
    Markup(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}
