//! Object store gateway.
//!
//! The pipeline only needs two operations from durable storage: overwrite a
//! blob under `(bucket, key)` and read it back. [`ObjectStore`] captures that
//! contract and [`StoreBackend`] picks an implementation at runtime:
//!
//! | Backend | Module | Notes |
//! |---------|--------|-------|
//! | Memory | [`memory`] | Process-local; dry runs and tests |
//! | Filesystem | [`fs`] | `<root>/<bucket>/<key>` plus a metadata sidecar |
//! | S3 / MinIO | `s3` | Requires the `s3` cargo feature |
//!
//! Implementations must allow concurrent independent `put`s; uploads in one
//! batch share a single store.

pub mod fs;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use crate::error::{PipelineError, Result};
use bytes::Bytes;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, instrument};

pub use fs::FsStore;
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// Durable key/blob storage organized into buckets.
pub trait ObjectStore {
    /// Write `bytes` under `(bucket, key)`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()>;

    /// Read the object at `(bucket, key)`.
    ///
    /// Returns [`PipelineError::NotFound`] when no such object exists.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;
}

/// Which backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    #[default]
    Fs,
    S3,
}

/// Connection settings for an S3-compatible endpoint such as MinIO.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

/// Everything needed to open a [`StoreBackend`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub dir: PathBuf,
    pub s3: S3Settings,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::Fs,
            dir: PathBuf::from("./objects"),
            s3: S3Settings::default(),
        }
    }
}

/// Runtime choice of object store.
#[derive(Debug)]
pub enum StoreBackend {
    Memory(MemoryStore),
    Fs(FsStore),
    #[cfg(feature = "s3")]
    S3(S3Store),
}

impl StoreBackend {
    /// Open the configured backend and make sure `buckets` are usable.
    #[instrument(level = "info", skip(settings), fields(kind = ?settings.kind))]
    pub async fn open(settings: &StoreSettings, buckets: &[&str]) -> Result<Self> {
        let backend = match settings.kind {
            StoreKind::Memory => Self::Memory(MemoryStore::new()),
            StoreKind::Fs => {
                let store = FsStore::new(&settings.dir);
                store.prepare(buckets).await?;
                Self::Fs(store)
            }
            #[cfg(feature = "s3")]
            StoreKind::S3 => Self::S3(S3Store::connect(&settings.s3, buckets)?),
            #[cfg(not(feature = "s3"))]
            StoreKind::S3 => {
                return Err(PipelineError::Configuration(
                    "the s3 store requires building with `--features s3`".to_string(),
                ));
            }
        };
        info!(?buckets, "Object store ready");
        Ok(backend)
    }
}

impl ObjectStore for StoreBackend {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        match self {
            Self::Memory(store) => store.put(bucket, key, bytes, content_type).await,
            Self::Fs(store) => store.put(bucket, key, bytes, content_type).await,
            #[cfg(feature = "s3")]
            Self::S3(store) => store.put(bucket, key, bytes, content_type).await,
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        match self {
            Self::Memory(store) => store.get(bucket, key).await,
            Self::Fs(store) => store.get(bucket, key).await,
            #[cfg(feature = "s3")]
            Self::S3(store) => store.get(bucket, key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_fs_backend_prepares_buckets() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = StoreSettings {
            kind: StoreKind::Fs,
            dir: tmp.path().to_path_buf(),
            s3: S3Settings::default(),
        };

        let store = StoreBackend::open(&settings, &["raw", "translated"]).await.unwrap();
        assert!(matches!(store, StoreBackend::Fs(_)));
        assert!(tmp.path().join("raw").is_dir());
        assert!(tmp.path().join("translated").is_dir());
    }

    #[tokio::test]
    async fn test_backend_dispatches_put_and_get() {
        let settings = StoreSettings {
            kind: StoreKind::Memory,
            ..StoreSettings::default()
        };
        let store = StoreBackend::open(&settings, &["raw"]).await.unwrap();

        store
            .put("raw", "a.pdf", Bytes::from_static(b"one"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(store.get("raw", "a.pdf").await.unwrap(), Bytes::from_static(b"one"));
        assert!(matches!(
            store.get("raw", "b.pdf").await,
            Err(PipelineError::NotFound { .. })
        ));
    }

    #[cfg(not(feature = "s3"))]
    #[tokio::test]
    async fn test_s3_without_feature_is_configuration_error() {
        let settings = StoreSettings {
            kind: StoreKind::S3,
            ..StoreSettings::default()
        };
        assert!(matches!(
            StoreBackend::open(&settings, &["raw"]).await,
            Err(PipelineError::Configuration(_))
        ));
    }
}
