//! Directory-backed object store.
//!
//! Layout:
//!
//! ```text
//! root/
//! ├── raw/
//! │   ├── 2501.01234v1.pdf
//! │   └── 2501.01234v1.pdf.meta.json
//! └── translated/
//!     └── 2025-01-01/
//!         ├── 2501.01234v1.txt
//!         └── 2501.01234v1.txt.meta.json
//! ```
//!
//! Blobs are written to a temporary file and renamed into place, so a reader
//! sees either the old or the new content of an overwritten key.

use super::ObjectStore;
use crate::error::{PipelineError, Result};
use crate::models::ObjectMeta;
use crate::utils::ensure_writable_dir;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

const METADATA_SUFFIX: &str = ".meta.json";

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the bucket directories and check they are writable.
    #[instrument(level = "info", skip(self), fields(root = %self.root.display()))]
    pub async fn prepare(&self, buckets: &[&str]) -> Result<()> {
        for bucket in buckets {
            let dir = self.bucket_dir(bucket)?;
            ensure_writable_dir(&dir)
                .await
                .map_err(|e| PipelineError::storage(bucket, "", e))?;
        }
        Ok(())
    }

    /// Content type recorded for an object, if any.
    #[cfg(test)]
    pub async fn content_type(&self, bucket: &str, key: &str) -> Result<String> {
        let path = meta_path(&self.object_path(bucket, key)?);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::not_found(bucket, key));
            }
            Err(e) => return Err(PipelineError::storage(bucket, key, e)),
        };
        let meta: ObjectMeta =
            serde_json::from_slice(&raw).map_err(|e| PipelineError::storage(bucket, key, e))?;
        Ok(meta.content_type)
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if !is_plain_relative(Path::new(bucket)) || bucket.contains('/') {
            return Err(PipelineError::storage(bucket, "", "invalid bucket name"));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let key_path = Path::new(key);
        if key.is_empty() || key.ends_with('/') || !is_plain_relative(key_path) {
            return Err(PipelineError::storage(bucket, key, "invalid object key"));
        }
        Ok(self.bucket_dir(bucket)?.join(key_path))
    }
}

impl ObjectStore for FsStore {
    #[instrument(level = "debug", skip(self, bytes), fields(len = bytes.len()))]
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        let storage_err = |e: std::io::Error| PipelineError::storage(bucket, key, e);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(storage_err)?;
        }

        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            size: bytes.len(),
        };
        let meta_json =
            serde_json::to_vec(&meta).map_err(|e| PipelineError::storage(bucket, key, e))?;

        replace_file(&path, &bytes).await.map_err(storage_err)?;
        replace_file(&meta_path(&path), &meta_json)
            .await
            .map_err(storage_err)?;

        debug!(path = %path.display(), "Wrote object");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PipelineError::not_found(bucket, key)),
            Err(e) => Err(PipelineError::storage(bucket, key, e)),
        }
    }
}

/// Only normal components: no root, no `..`, no `.`.
fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn meta_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

/// Write `contents` beside `path` and rename over it. The temporary file is
/// removed if either step fails.
async fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(path);
    let written = match fs::write(&tmp, contents).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    written
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".tmp-{:016x}", rand::random::<u64>()));
    PathBuf::from(name)
}
