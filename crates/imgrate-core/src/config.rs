//! Configuration module
//!
//! Environment-driven configuration for the migrator: database connection,
//! storage backend selection, and fetch behavior.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BUCKET: &str = "quesimage";
const DEFAULT_REGION: &str = "auto";
// GCS interoperability endpoint; public URLs come out as
// https://storage.googleapis.com/{bucket}/{key}.
const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage_backend: StorageBackend,
    pub storage_bucket: String,
    pub storage_region: String,
    pub storage_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub fetch_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let storage_backend = env::var("STORAGE_BACKEND")
            .map(|s| StorageBackend::from_str(&s))
            .unwrap_or(Ok(StorageBackend::S3))?;

        Ok(Config {
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            storage_region: env::var("STORAGE_REGION")
                .unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            storage_endpoint: match env::var("STORAGE_ENDPOINT") {
                Ok(endpoint) if endpoint.trim().is_empty() => None,
                Ok(endpoint) => Some(endpoint),
                Err(_) => Some(DEFAULT_ENDPOINT.to_string()),
            },
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            fetch_timeout_seconds: env::var("FETCH_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| FETCH_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(FETCH_TIMEOUT_SECS),
        })
    }

    /// Validate backend-specific required settings before any connection
    /// is attempted.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.storage_bucket.trim().is_empty() {
                    return Err(anyhow::anyhow!("STORAGE_BUCKET cannot be empty"));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set for the local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set for the local storage backend"
                    ));
                }
            }
        }
        Ok(())
    }
}
