//! Data model for the harvesting pipeline.
//!
//! - [`ListingUrl`]: one "recent submissions" page found by discovery
//! - [`ArtifactLink`]: one downloadable PDF found on a listing page
//! - [`StoredObject`]: a blob as held by an object store
//! - [`UploadReport`] / [`RunSummary`]: counters reported at the end of a run
//! - [`TranslatedObject`]: the output of one translation job

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Absolute URL of a listing page. No identity beyond its string value.
pub type ListingUrl = String;

/// Absolute URL of a downloadable artifact. Equality is exact string equality.
pub type ArtifactLink = String;

/// Content type written for raw artifacts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type written for translated text.
pub const TEXT_CONTENT_TYPE: &str = "application/txt";

/// A blob in an object store, addressed by `(bucket, key)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
}

/// Metadata persisted next to a blob by backends that cannot attach it natively.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: String,
    pub size: usize,
}

/// Outcome counters of one batch upload pass.
///
/// Failures are counted, never raised: `stored + failed == attempted`.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct UploadReport {
    pub attempted: usize,
    pub stored: usize,
    pub failed: usize,
    pub chunks: usize,
}

/// Outcome counters of one full scrape run.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub listing_pages: usize,
    pub pages_failed: usize,
    pub links_collected: usize,
    pub upload: UploadReport,
}

/// A translated document written back to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedObject {
    pub bucket: String,
    pub key: String,
    pub bytes: Vec<u8>,
}
