//! # Paper Harvest
//!
//! A harvesting pipeline for a preprint archive. It discovers the "recent"
//! listing page of every subject category, collects the PDF links on each
//! page, downloads the PDFs in rate-limited chunks, and stores them in an
//! S3-compatible object store. A second, on-demand operation translates one
//! stored paper into a target language and stores the text under a date
//! folder.
//!
//! ## Usage
//!
//! ```sh
//! paper_harvest scrape --batch-size 5 --delay-seconds 3
//! paper_harvest translate --object-key 2501.01234v1.pdf --target-language ukrainian
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: scan the site root once for subject listing pages
//! 2. **Scraping**: read every listing page concurrently, keeping up to N PDF links each
//! 3. **Uploading**: fetch and store artifacts in chunks, pausing between chunks
//! 4. **Translation**: extract, translate, and store one document on demand
//!
//! Failures of individual pages or artifacts are logged and skipped; a run
//! reports success even when some of them were lost.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod http;
mod models;
mod orchestrator;
mod scrapers;
mod storage;
#[cfg(test)]
mod testing;
mod translate;
mod triggers;
mod uploader;
mod utils;

use cli::{Cli, Command};
use config::PipelineConfig;
use triggers::{ScrapeParams, TranslateParams};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("paper_harvest starting up");

    let args = Cli::parse();
    debug!(command = ?args.command, config = ?args.config, "Parsed CLI arguments");

    let mut config = PipelineConfig::load(args.config.as_deref())
        .await
        .inspect_err(|e| error!(error = %e, "Failed to load configuration"))?;
    args.apply(&mut config);

    match &args.command {
        Command::Scrape(_) => {
            let params = ScrapeParams::new(config.batch_size, config.delay_secs)?;
            let summary = triggers::trigger_scrape(&config, params)
                .await
                .inspect_err(|e| {
                    if e.is_fetch() {
                        error!(error = %e, root = %config.root_url, "Site root unreachable; scrape run aborted");
                    } else {
                        error!(error = %e, "Scrape run aborted");
                    }
                })?;
            info!(summary = %serde_json::to_string(&summary)?, "Run summary");
        }
        Command::Translate(translate_args) => {
            let params = TranslateParams::resolve(
                translate_args.object_key.clone(),
                translate_args.conf.as_deref(),
                translate_args.target_language.clone(),
                &config.target_language,
            )?;
            let output = triggers::trigger_translate(&config, params)
                .await
                .inspect_err(|e| error!(error = %e, "Translation failed"))?;
            info!(bucket = %output.bucket, key = %output.key, bytes = output.bytes.len(), "Translation stored");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed = ?Duration::from_secs(elapsed.as_secs()),
        "paper_harvest finished"
    );
    Ok(())
}
