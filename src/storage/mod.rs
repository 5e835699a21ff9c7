//! Image storage. Uploads return a public URL plus a handle for later deletion.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;

mod cloudinary;
mod memory;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
pub use memory::InMemoryBlobStore;

#[derive(Error, Debug)]
pub enum BlobStoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

/// Uploaded file as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub url: String,
    pub public_id: String,
}

/// File received from a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, upload: Upload) -> Result<StoredBlob, BlobStoreError>;

    async fn delete(&self, public_id: &str) -> Result<(), BlobStoreError>;
}

pub type SharedBlobStore = Arc<dyn BlobStore>;

/// Picks the blob backend named by `blob_backend`.
pub fn blob_store_from_config(cfg: &AppConfig) -> Result<SharedBlobStore, BlobStoreError> {
    if cfg.uses_cloudinary() {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BlobStoreError::Config(format!("{} is not set", name)))
        };
        let config = CloudinaryConfig::new(
            required(&cfg.cloudinary_cloud_name, "cloudinary_cloud_name")?,
            required(&cfg.cloudinary_api_key, "cloudinary_api_key")?,
            required(&cfg.cloudinary_api_secret, "cloudinary_api_secret")?,
            cfg.cloudinary_folder.clone(),
        );
        Ok(Arc::new(CloudinaryStore::new(config, cfg.http_timeout())?))
    } else {
        Ok(Arc::new(InMemoryBlobStore::new()))
    }
}
