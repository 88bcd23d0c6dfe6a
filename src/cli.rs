//! Command-line interface: the two triggers a scheduler can invoke.
//!
//! Every flag can also be provided through the environment variable named in
//! its help text. Flags override values from the `--config` file.

use crate::config::PipelineConfig;
use crate::http::TlsPolicy;
use crate::storage::StoreKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Discover newly listed papers, archive their PDFs, and translate them.
///
/// # Examples
///
/// ```sh
/// # Scrape with five downloads per chunk and three seconds between chunks
/// paper_harvest scrape --batch-size 5 --delay-seconds 3
///
/// # Translate one stored paper
/// paper_harvest translate --object-key 2501.01234v1.pdf --target-language ukrainian
///
/// # Same, with a scheduler-style run configuration
/// paper_harvest translate --conf '{"file_name": "2501.01234v1.pdf"}'
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, env = "PAPER_HARVEST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub http: HttpArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover listing pages, collect PDF links, and upload them in chunks
    Scrape(ScrapeArgs),
    /// Translate one stored PDF and store the text in the translated bucket
    Translate(TranslateArgs),
}

#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Object store backend
    #[arg(long, value_enum, env = "STORE_KIND", global = true)]
    pub store: Option<StoreKind>,

    /// Root directory of the filesystem store
    #[arg(long, env = "STORE_DIR", global = true)]
    pub store_dir: Option<PathBuf>,

    /// S3/MinIO endpoint, e.g. `minio:9000`
    #[arg(long, env = "MINIO_URL", global = true)]
    pub minio_url: Option<String>,

    #[arg(long, env = "MINIO_ACCESS_KEY", hide_env_values = true, global = true)]
    pub minio_access_key: Option<String>,

    #[arg(long, env = "MINIO_SECRET_KEY", hide_env_values = true, global = true)]
    pub minio_secret_key: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct HttpArgs {
    /// User agent sent with every request
    #[arg(long, env = "USER_AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Certificate validation policy
    #[arg(long, value_enum, env = "TLS_POLICY", global = true)]
    pub tls: Option<TlsPolicy>,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", global = true)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct ScrapeArgs {
    /// Artifacts fetched and uploaded concurrently per chunk
    #[arg(long, env = "BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Pause between chunks, in seconds
    #[arg(long, env = "DELAY_SECONDS")]
    pub delay_seconds: Option<u64>,

    /// Site root whose subject sections are scanned
    #[arg(long, env = "ROOT_URL")]
    pub root_url: Option<String>,

    /// Maximum PDF links kept per listing page
    #[arg(long, env = "PAGE_LIMIT")]
    pub page_limit: Option<usize>,

    /// Bucket receiving raw PDFs
    #[arg(long, env = "RAW_BUCKET")]
    pub bucket: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct TranslateArgs {
    /// Key of the PDF in the raw bucket
    #[arg(long, env = "OBJECT_KEY")]
    pub object_key: Option<String>,

    /// Language to translate into
    #[arg(long, env = "TARGET_LANGUAGE")]
    pub target_language: Option<String>,

    /// JSON run configuration, e.g. `{"file_name": "paper.pdf"}`
    #[arg(long, env = "RUN_CONF")]
    pub conf: Option<String>,

    /// Bucket receiving translated text
    #[arg(long, env = "TRANSLATED_BUCKET")]
    pub bucket: Option<String>,

    /// Chat completion model
    #[arg(long, env = "TRANSLATION_MODEL")]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    pub api_base: Option<String>,

    /// API key for the translation service
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Retries after a failed translation request
    #[arg(long, env = "TRANSLATION_RETRIES")]
    pub retries: Option<usize>,
}

impl Cli {
    /// Overlay command-line values onto `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        let store = &self.store;
        if let Some(kind) = store.store {
            config.store.kind = kind;
        }
        if let Some(dir) = &store.store_dir {
            config.store.dir = dir.clone();
        }
        override_opt(&mut config.store.s3.endpoint, &store.minio_url);
        override_opt(&mut config.store.s3.access_key, &store.minio_access_key);
        override_opt(&mut config.store.s3.secret_key, &store.minio_secret_key);

        override_val(&mut config.user_agent, &self.http.user_agent);
        if let Some(tls) = self.http.tls {
            config.tls = tls;
        }
        if let Some(secs) = self.http.request_timeout_secs {
            config.request_timeout_secs = secs;
        }

        match &self.command {
            Command::Scrape(args) => {
                override_val(&mut config.root_url, &args.root_url);
                override_val(&mut config.raw_bucket, &args.bucket);
                if let Some(limit) = args.page_limit {
                    config.page_limit = limit;
                }
                if let Some(batch_size) = args.batch_size {
                    config.batch_size = batch_size;
                }
                if let Some(delay) = args.delay_seconds {
                    config.delay_secs = delay;
                }
            }
            Command::Translate(args) => {
                override_val(&mut config.translated_bucket, &args.bucket);
                override_val(&mut config.target_language, &args.target_language);
                override_val(&mut config.translation.model, &args.model);
                override_opt(&mut config.translation.api_base, &args.api_base);
                override_opt(&mut config.translation.api_key, &args.api_key);
                if let Some(retries) = args.retries {
                    config.translation.retries = retries;
                }
            }
        }
    }
}

fn override_val(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

fn override_opt(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        *target = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_scrape_parsing() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "scrape",
            "--batch-size",
            "2",
            "--delay-seconds",
            "10",
        ]);

        let Command::Scrape(args) = &cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.batch_size, Some(2));
        assert_eq!(args.delay_seconds, Some(10));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "translate",
            "--object-key",
            "paper.pdf",
            "--store",
            "memory",
            "--tls",
            "strict",
        ]);

        assert_eq!(cli.store.store, Some(StoreKind::Memory));
        assert_eq!(cli.http.tls, Some(TlsPolicy::Strict));
        let Command::Translate(args) = &cli.command else {
            panic!("expected translate");
        };
        assert_eq!(args.object_key.as_deref(), Some("paper.pdf"));
    }

    #[test]
    fn test_apply_overrides_only_given_values() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "scrape",
            "--batch-size",
            "8",
            "--root-url",
            "https://example.org",
            "--store-dir",
            "/tmp/objects",
        ]);
        let mut config = PipelineConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.batch_size, 8);
        assert_eq!(config.root_url, "https://example.org");
        assert_eq!(config.store.dir, PathBuf::from("/tmp/objects"));
        assert_eq!(config.delay_secs, 3);
        assert_eq!(config.raw_bucket, "raw");
    }

    #[test]
    fn test_every_flag_has_an_env_var() {
        let command = Cli::command();
        let mut args: Vec<&clap::Arg> = command.get_arguments().collect();
        for sub in command.get_subcommands() {
            args.extend(sub.get_arguments());
        }

        let missing: Vec<_> = args
            .iter()
            .filter(|arg| !matches!(arg.get_id().as_str(), "help" | "version"))
            .filter(|arg| arg.get_env().is_none())
            .map(|arg| arg.get_id().to_string())
            .collect();
        assert!(missing.is_empty(), "flags without env: {missing:?}");
    }

    #[test]
    fn test_apply_translate_settings() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "translate",
            "--target-language",
            "german",
            "--api-key",
            "sk-test",
            "--retries",
            "3",
        ]);
        let mut config = PipelineConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.target_language, "german");
        assert_eq!(config.translation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.translation.retries, 3);
    }
}
