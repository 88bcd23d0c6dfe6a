//! Pipeline configuration.
//!
//! Values are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults ([`PipelineConfig::default`])
//! 2. An optional YAML file passed with `--config`
//! 3. Command-line flags and their environment variables ([`crate::cli`])
//!
//! ```yaml
//! root_url: https://arxiv.org
//! page_limit: 5
//! batch_size: 5
//! delay_secs: 3
//! raw_bucket: raw
//! translated_bucket: translated
//! store:
//!   kind: fs
//!   dir: /var/lib/paper_harvest
//! translation:
//!   model: gpt-4o
//!   retries: 2
//! ```

use crate::error::{PipelineError, Result};
use crate::http::{DEFAULT_USER_AGENT, HttpSettings, TlsPolicy};
use crate::scrapers::listing::DEFAULT_PAGE_LIMIT;
use crate::storage::StoreSettings;
use crate::translate::api::TranslationSettings;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

pub const DEFAULT_ROOT_URL: &str = "https://arxiv.org";
pub const DEFAULT_RAW_BUCKET: &str = "raw";
pub const DEFAULT_TRANSLATED_BUCKET: &str = "translated";
pub const DEFAULT_TARGET_LANGUAGE: &str = "ukrainian";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub root_url: String,
    pub user_agent: String,
    pub tls: TlsPolicy,
    pub request_timeout_secs: u64,
    pub page_limit: usize,
    pub batch_size: usize,
    pub delay_secs: u64,
    pub raw_bucket: String,
    pub translated_bucket: String,
    pub target_language: String,
    pub store: StoreSettings,
    pub translation: TranslationSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tls: TlsPolicy::Relaxed,
            request_timeout_secs: 60,
            page_limit: DEFAULT_PAGE_LIMIT,
            batch_size: 5,
            delay_secs: 3,
            raw_bucket: DEFAULT_RAW_BUCKET.to_string(),
            translated_bucket: DEFAULT_TRANSLATED_BUCKET.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            store: StoreSettings::default(),
            translation: TranslationSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load the YAML file at `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| PipelineError::Configuration(format!("invalid configuration: {e}")))
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            tls: self.tls,
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
