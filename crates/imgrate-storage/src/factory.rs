use crate::{LocalStorage, S3Storage, Storage, StorageError, StorageResult};
use imgrate_core::{Config, StorageBackend};
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            if config.storage_bucket.trim().is_empty() {
                return Err(StorageError::Config(
                    "STORAGE_BUCKET not configured".to_string(),
                ));
            }

            let storage = S3Storage::new(
                config.storage_bucket.clone(),
                config.storage_region.clone(),
                config.storage_endpoint.clone(),
            )
            .await?;
            Ok(Arc::new(storage))
        }

        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::Config("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::Config("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }
    }
}
