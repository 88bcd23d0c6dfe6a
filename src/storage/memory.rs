//! In-process object store.

use super::ObjectStore;
use crate::error::{PipelineError, Result};
use crate::models::StoredObject;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Objects kept in a map keyed by `(bucket, key)`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of objects across all buckets.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Sorted keys stored in `bucket`.
    #[cfg(test)]
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl ObjectStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        let object = StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            bytes,
            content_type: content_type.to_string(),
        };
        debug!(%bucket, %key, bytes = object.bytes.len(), "Stored object in memory");
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), object);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.object(bucket, key)
            .await
            .map(|object| object.bytes)
            .ok_or_else(|| PipelineError::not_found(bucket, key))
    }
}
