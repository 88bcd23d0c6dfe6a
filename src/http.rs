//! The shared HTTP session used for every page and artifact fetch.
//!
//! One [`HttpSession`] is built per run. Its user agent, TLS policy, and
//! timeout are fixed at construction so every request is shaped the same way
//! and pooled connections can be reused across concurrent fetches.

use crate::error::{PipelineError, Result};
use bytes::Bytes;
use clap::ValueEnum;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Desktop browser user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Certificate validation policy for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TlsPolicy {
    /// Accept invalid or self-signed certificates.
    #[default]
    Relaxed,
    /// Validate certificates normally.
    Strict,
}

/// Fixed configuration of an [`HttpSession`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub tls: TlsPolicy,
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tls: TlsPolicy::Relaxed,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Capability to download the body of a URL after a status check.
///
/// Implemented by [`HttpSession`] for real runs; tests substitute fakes.
pub trait FetchBytes {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes>;
}

/// A pooled HTTP client with fixed request shaping.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .danger_accept_invalid_certs(settings.tls == TlsPolicy::Relaxed)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl FetchBytes for HttpSession {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        let fetch_err = |source| PipelineError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(fetch_err)?;
        debug!(bytes = body.len(), "Fetched body");
        Ok(body)
    }
}
