//! The two operations a scheduler can invoke.
//!
//! - `scrape(batch_size, delay_seconds)`: one full harvesting run. It fails
//!   only when the parameters are invalid, the store cannot be opened, or
//!   discovery fails. Pages and artifacts that fail are logged and skipped,
//!   so a successful trigger may still have stored only part of what was
//!   listed.
//! - `translate(object_key, target_language)`: translate one stored PDF.
//!   Every failure is returned.
//!
//! Parameters are validated before any network or storage work starts.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::http::HttpSession;
use crate::models::{RunSummary, TranslatedObject};
use crate::orchestrator::{RunSettings, ScrapeRun};
use crate::storage::StoreBackend;
use crate::translate::api::{OpenAiTranslator, RetryTranslate};
use crate::translate::extract::LopdfExtractor;
use crate::translate::{PostProcessor, TranslationBuckets};
use chrono::Local;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument};

/// Validated parameters of the scrape trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeParams {
    pub batch_size: usize,
    pub delay: Duration,
}

impl ScrapeParams {
    pub fn new(batch_size: usize, delay_seconds: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(PipelineError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            batch_size,
            delay: Duration::from_secs(delay_seconds),
        })
    }
}

/// Scheduler run configuration for the translate trigger.
///
/// `file_name` is accepted as an alias of `object_key`.
#[derive(Debug, Default, Deserialize)]
pub struct TranslateConf {
    #[serde(alias = "file_name")]
    pub object_key: Option<String>,
    pub target_language: Option<String>,
}

/// Validated parameters of the translate trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateParams {
    pub object_key: String,
    pub target_language: String,
}

impl TranslateParams {
    /// Combine an explicit object key, an optional JSON run configuration,
    /// and the configured default language. Explicit values win over `conf`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] if `conf` is not valid JSON or no
    /// object key is provided anywhere.
    pub fn resolve(
        object_key: Option<String>,
        conf: Option<&str>,
        target_language: Option<String>,
        default_language: &str,
    ) -> Result<Self> {
        let conf: TranslateConf = match conf {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                PipelineError::Configuration(format!("invalid run configuration: {e}"))
            })?,
            None => TranslateConf::default(),
        };

        let object_key = object_key
            .or(conf.object_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Configuration("object key not provided in run configuration".to_string())
            })?;
        let target_language = target_language
            .or(conf.target_language)
            .unwrap_or_else(|| default_language.to_string());

        Ok(Self {
            object_key,
            target_language,
        })
    }
}

/// Run one scrape over the configured site and store.
#[instrument(level = "info", skip(config), fields(root = %config.root_url))]
pub async fn trigger_scrape(config: &PipelineConfig, params: ScrapeParams) -> Result<RunSummary> {
    let store = StoreBackend::open(&config.store, &[config.raw_bucket.as_str()]).await?;
    let session = HttpSession::new(&config.http_settings())?;
    let settings = RunSettings {
        root_url: config.root_url.clone(),
        page_limit: config.page_limit,
        bucket: config.raw_bucket.clone(),
    };

    let run = ScrapeRun::initialize(session, store, settings).await?;
    info!(pages = run.listing_urls().len(), "Listing pages ready");
    let summary = run.run(params.batch_size, params.delay).await;
    info!(
        listing_pages = summary.listing_pages,
        pages_failed = summary.pages_failed,
        links = summary.links_collected,
        stored = summary.upload.stored,
        failed = summary.upload.failed,
        "Scrape run finished"
    );
    Ok(summary)
}

/// Translate one stored artifact, dating the output folder with today's
/// local date.
#[instrument(level = "info", skip(config))]
pub async fn trigger_translate(
    config: &PipelineConfig,
    params: TranslateParams,
) -> Result<TranslatedObject> {
    let translator = RetryTranslate::new(
        OpenAiTranslator::new(&config.translation)?,
        config.translation.retries,
        Duration::from_secs(1),
    );
    let buckets = TranslationBuckets {
        raw: config.raw_bucket.clone(),
        translated: config.translated_bucket.clone(),
    };
    let store = StoreBackend::open(&config.store, &[buckets.raw.as_str(), buckets.translated.as_str()])
        .await?;

    let processor = PostProcessor::new(store, LopdfExtractor, translator, buckets);
    let date = Local::now().date_naive();
    processor
        .translate(&params.object_key, &params.target_language, date)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StoreKind, StoreSettings};
    use mockito::Server;

    #[test]
    fn test_zero_batch_size_is_configuration_error() {
        assert!(matches!(
            ScrapeParams::new(0, 3),
            Err(PipelineError::Configuration(_))
        ));
        assert_eq!(
            ScrapeParams::new(2, 3).unwrap(),
            ScrapeParams {
                batch_size: 2,
                delay: Duration::from_secs(3)
            }
        );
    }

    #[test]
    fn test_translate_params_from_conf_file_name() {
        let params =
            TranslateParams::resolve(None, Some(r#"{"file_name": "paper.pdf"}"#), None, "ukrainian")
                .unwrap();
        assert_eq!(params.object_key, "paper.pdf");
        assert_eq!(params.target_language, "ukrainian");
    }

    #[test]
    fn test_explicit_values_win_over_conf() {
        let params = TranslateParams::resolve(
            Some("b.pdf".to_string()),
            Some(r#"{"object_key": "a.pdf", "target_language": "french"}"#),
            Some("german".to_string()),
            "ukrainian",
        )
        .unwrap();
        assert_eq!(params.object_key, "b.pdf");
        assert_eq!(params.target_language, "german");
    }

    #[test]
    fn test_missing_object_key_is_configuration_error() {
        for conf in [None, Some("{}"), Some(r#"{"file_name": ""}"#)] {
            assert!(matches!(
                TranslateParams::resolve(None, conf, None, "ukrainian"),
                Err(PipelineError::Configuration(_))
            ));
        }
        assert!(matches!(
            TranslateParams::resolve(None, Some("not json"), None, "ukrainian"),
            Err(PipelineError::Configuration(_))
        ));
    }

    fn memory_config() -> PipelineConfig {
        PipelineConfig {
            store: StoreSettings {
                kind: StoreKind::Memory,
                ..StoreSettings::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_translate_without_api_key_fails_before_work() {
        let params = TranslateParams {
            object_key: "paper.pdf".to_string(),
            target_language: "ukrainian".to_string(),
        };
        let err = trigger_translate(&memory_config(), params).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_scrape_trigger_against_local_site() {
        let mut server = Server::new_async().await;
        let root_html = r#"
            <h2>Intro</h2>
            <h2>Mathematics</h2>
            <ul><li>Algebra (<a href="/list/math.AG/new">new</a>, <a href="/list/math.AG/recent">recent</a>)</li></ul>
            <h2>About</h2>
        "#;
        let listing_html = r#"<dl>
            <dt><a href="/pdf/2501.00001" title="Download PDF">pdf</a></dt><dd>one</dd>
            <dt><a href="/pdf/2501.00002" title="Download PDF">pdf</a></dt><dd>two</dd>
            <dt><a href="/pdf/2501.00003" title="Download PDF">pdf</a></dt><dd>three</dd>
        </dl>"#;

        server.mock("GET", "/").with_body(root_html).create_async().await;
        server
            .mock("GET", "/list/math.AG/recent")
            .with_body(listing_html)
            .create_async()
            .await;
        server
            .mock("GET", "/pdf/2501.00001")
            .with_body("%PDF-1")
            .create_async()
            .await;
        server
            .mock("GET", "/pdf/2501.00002")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/pdf/2501.00003")
            .with_body("%PDF-3")
            .create_async()
            .await;

        let config = PipelineConfig {
            root_url: server.url(),
            ..memory_config()
        };
        let summary = trigger_scrape(&config, ScrapeParams::new(2, 0).unwrap())
            .await
            .unwrap();

        assert_eq!(summary.listing_pages, 1);
        assert_eq!(summary.links_collected, 3);
        assert_eq!(summary.upload.stored, 2);
        assert_eq!(summary.upload.failed, 1);
        assert_eq!(summary.upload.chunks, 2);
    }
}
