//! Translation service client with optional exponential backoff.
//!
//! - [`Translate`]: the capability the post-processor consumes
//! - [`OpenAiTranslator`]: one chat completion per document via `async-openai`
//! - [`RetryTranslate`]: decorator that retries any [`Translate`] with backoff
//!
//! The whole document goes out as a single request. Documents too large for
//! the model's context fail with a translation service error; there is no
//! chunking.
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::error::{PipelineError, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use rand::{Rng, rng};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Capability to translate a whole text in one request.
pub trait Translate {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Settings for the translation client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    pub model: String,
    pub api_base: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Extra attempts after the first failure. Zero disables retrying.
    pub retries: usize,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: None,
            api_key: None,
            retries: 0,
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Translate`].
pub struct RetryTranslate<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryTranslate<T>
where
    T: Translate,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryTranslate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTranslate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Translate for RetryTranslate<T>
where
    T: Translate,
{
    #[instrument(level = "info", skip_all, fields(%target_language))]
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.translate(text, target_language).await {
                Ok(translated) => return Ok(translated),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "translate() exhausted retries"
                        );
                        return Err(e);
                    }

                    let shift = (attempt - 1).min(16) as u32;
                    let delay = self
                        .base_delay
                        .saturating_mul(1 << shift)
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "translate() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Translator backed by an OpenAI-compatible chat completion endpoint.
pub struct OpenAiTranslator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl fmt::Debug for OpenAiTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiTranslator")
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiTranslator {
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] when no API key is configured.
    pub fn new(settings: &TranslationSettings) -> Result<Self> {
        let api_key = settings.api_key.as_deref().ok_or_else(|| {
            PipelineError::Configuration("translation requires API_KEY to be set".to_string())
        })?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(api_base) = &settings.api_base {
            config = config.with_api_base(api_base);
        }

        Ok(Self {
            client: Client::with_config(config),
            model: settings.model.clone(),
        })
    }
}

/// Instruction sent ahead of the document text.
pub fn translation_prompt(target_language: &str) -> String {
    format!("Please translate the following text to {target_language}:")
}

impl Translate for OpenAiTranslator {
    #[instrument(level = "info", skip_all, fields(model = %self.model, %target_language, chars = text.len()))]
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let service_err = |e: async_openai::error::OpenAIError| {
            PipelineError::TranslationService(e.to_string())
        };

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(translation_prompt(target_language))
            .build()
            .map_err(service_err)?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(text)
            .build()
            .map_err(service_err)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .build()
            .map_err(service_err)?;

        let t0 = Instant::now();
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "API call failed");
            service_err(e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                PipelineError::TranslationService("response contained no translation".to_string())
            })?;

        info!(elapsed_ms = t0.elapsed().as_millis(), chars = content.len(), "Translation received");
        Ok(content)
    }
}
