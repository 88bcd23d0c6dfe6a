//! Error taxonomy for the harvesting pipeline.
//!
//! Which of these errors stop a run depends on where they are raised:
//!
//! | Raised by | Policy |
//! |-----------|--------|
//! | Listing discovery | Fatal, propagated to the trigger |
//! | Listing page scraper | Logged, page yields no links |
//! | Batch uploader / store writes | Logged, item dropped |
//! | Translation post-processor | Propagated to the trigger |
//! | Trigger parameter validation | Propagated before any work starts |

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: StatusCode },

    #[error("could not parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("storage operation on {bucket}/{key} failed: {reason}")]
    Storage {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("object {bucket}/{key} does not exist")]
    NotFound { bucket: String, key: String },

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("translation service error: {0}")]
    TranslationService(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot derive an object key from artifact url {0}")]
    InvalidArtifactUrl(String),
}

impl PipelineError {
    /// Both transport failures and bad statuses count as fetch failures.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Status { .. })
    }

    pub(crate) fn storage(bucket: &str, key: &str, reason: impl ToString) -> Self {
        Self::Storage {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}
