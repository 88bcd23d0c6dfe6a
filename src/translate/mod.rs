//! Translation post-processor.
//!
//! Runs on demand for one stored artifact: read it from the raw bucket,
//! extract its text, translate the whole text in one request, and write the
//! result to the translated bucket under `YYYY-MM-DD/<name>.txt`. There is no
//! job record; the output object existing is the only sign of success.
//!
//! Every failure propagates to the caller. Nothing is written unless the
//! translation succeeded.

pub mod api;
pub mod extract;

use crate::error::Result;
use crate::models::{TEXT_CONTENT_TYPE, TranslatedObject};
use crate::storage::ObjectStore;
use crate::utils::{translated_key, truncate_for_log};
use api::Translate;
use bytes::Bytes;
use chrono::NaiveDate;
use extract::ExtractText;
use tracing::{debug, info, instrument, warn};

/// Bucket names the post-processor reads from and writes to.
#[derive(Debug, Clone)]
pub struct TranslationBuckets {
    pub raw: String,
    pub translated: String,
}

#[derive(Debug)]
pub struct PostProcessor<S, E, T> {
    store: S,
    extractor: E,
    translator: T,
    buckets: TranslationBuckets,
}

impl<S, E, T> PostProcessor<S, E, T>
where
    S: ObjectStore,
    E: ExtractText,
    T: Translate,
{
    pub fn new(store: S, extractor: E, translator: T, buckets: TranslationBuckets) -> Self {
        Self {
            store,
            extractor,
            translator,
            buckets,
        }
    }

    /// Translate the raw object `object_key` into `target_language` and store
    /// the result in the date folder for `date`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the raw object is absent
    /// - `Extraction` if its text cannot be extracted
    /// - `TranslationService` if the translation request fails
    /// - `Storage` if the result cannot be written
    #[instrument(level = "info", skip(self), fields(bucket = %self.buckets.raw))]
    pub async fn translate(
        &self,
        object_key: &str,
        target_language: &str,
        date: NaiveDate,
    ) -> Result<TranslatedObject> {
        let document = self.store.get(&self.buckets.raw, object_key).await?;
        info!(bytes = document.len(), "Downloaded source document");

        let text = self.extractor.extract_text(&document)?;
        if text.trim().is_empty() {
            warn!("Extracted text is empty; translating anyway");
        }
        debug!(preview = %truncate_for_log(&text, 200), "Text extraction complete");

        let translated = self.translator.translate(&text, target_language).await?;
        info!(chars = translated.chars().count(), "Translation complete");

        let key = translated_key(object_key, date);
        let bytes = translated.into_bytes();
        self.store
            .put(
                &self.buckets.translated,
                &key,
                Bytes::from(bytes.clone()),
                TEXT_CONTENT_TYPE,
            )
            .await?;
        info!(bucket = %self.buckets.translated, %key, "Stored translation");

        Ok(TranslatedObject {
            bucket: self.buckets.translated.clone(),
            key,
            bytes,
        })
    }
}
