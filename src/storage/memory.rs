use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BlobStore, BlobStoreError, StoredBlob, Upload};

/// Keeps uploads in process memory. URLs use the `memory://` scheme.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, public_id: &str) -> bool {
        self.blobs.read().await.contains_key(public_id)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, upload: Upload) -> Result<StoredBlob, BlobStoreError> {
        let public_id = format!("thrift-market/{}", Uuid::new_v4().simple());
        let url = format!("memory://{}/{}", public_id, upload.file_name);
        self.blobs
            .write()
            .await
            .insert(public_id.clone(), upload.data);
        Ok(StoredBlob { url, public_id })
    }

    async fn delete(&self, public_id: &str) -> Result<(), BlobStoreError> {
        self.blobs
            .write()
            .await
            .remove(public_id)
            .map(|_| ())
            .ok_or_else(|| BlobStoreError::NotFound(public_id.to_string()))
    }
}
