//! Batch uploader: fetch artifacts and persist them in throttled chunks.
//!
//! Links are cut into contiguous chunks of `batch_size`. Chunks run strictly
//! one after another; links inside a chunk are fetched and stored
//! concurrently. Once every member of a chunk has settled, the uploader
//! sleeps for `delay` before starting the next chunk. This pause is the
//! pipeline's only throttle toward the source site and the store.
//!
//! Each item is "fetch, then store". A failure in either step is logged and
//! the item dropped. Nothing is retried and nothing propagates, so a chunk in
//! which every item fails still completes.

use crate::error::Result;
use crate::http::FetchBytes;
use crate::models::{ArtifactLink, PDF_CONTENT_TYPE, UploadReport};
use crate::storage::ObjectStore;
use crate::utils::artifact_key;
use futures::future::join_all;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Split `links` into contiguous chunks of `batch_size` (the last may be
/// shorter). A `batch_size` of zero is treated as one.
pub fn partition(links: &[ArtifactLink], batch_size: usize) -> std::slice::Chunks<'_, ArtifactLink> {
    links.chunks(batch_size.max(1))
}

/// Fetches artifacts through `fetcher` and writes them to `bucket` in `store`.
#[derive(Debug)]
pub struct BatchUploader<'a, F, S> {
    fetcher: &'a F,
    store: &'a S,
    bucket: &'a str,
    batch_size: usize,
    delay: Duration,
}

impl<'a, F, S> BatchUploader<'a, F, S>
where
    F: FetchBytes,
    S: ObjectStore,
{
    pub fn new(fetcher: &'a F, store: &'a S, bucket: &'a str, batch_size: usize, delay: Duration) -> Self {
        if batch_size == 0 {
            warn!("Batch size 0 requested; using 1");
        }
        Self {
            fetcher,
            store,
            bucket,
            batch_size: batch_size.max(1),
            delay,
        }
    }

    /// Upload every link, chunk by chunk, and report what happened.
    #[instrument(level = "info", skip_all, fields(bucket = %self.bucket, links = links.len(), batch_size = self.batch_size))]
    pub async fn upload_all(&self, links: &[ArtifactLink]) -> UploadReport {
        let chunks: Vec<&[ArtifactLink]> = partition(links, self.batch_size).collect();
        let mut report = UploadReport {
            attempted: links.len(),
            chunks: chunks.len(),
            ..UploadReport::default()
        };

        for (index, chunk) in chunks.iter().enumerate() {
            info!(chunk = index + 1, of = chunks.len(), size = chunk.len(), "Processing chunk");

            let outcomes = join_all(chunk.iter().map(|url| self.upload_one(url))).await;
            let stored = outcomes.iter().filter(|ok| **ok).count();
            report.stored += stored;
            report.failed += outcomes.len() - stored;

            if index + 1 < chunks.len() {
                info!(delay_secs = self.delay.as_secs_f64(), stored, "Chunk settled; pausing");
                sleep(self.delay).await;
            } else {
                info!(stored, "Final chunk settled");
            }
        }

        info!(
            attempted = report.attempted,
            stored = report.stored,
            failed = report.failed,
            "Upload pass complete"
        );
        report
    }

    /// Fetch and store one artifact. Failures are logged here and never
    /// leave this function.
    async fn upload_one(&self, url: &str) -> bool {
        match self.fetch_and_store(url).await {
            Ok(key) => {
                info!(%url, %key, "Uploaded artifact");
                true
            }
            Err(e) => {
                error!(%url, error = %e, "Error downloading or uploading artifact");
                false
            }
        }
    }

    async fn fetch_and_store(&self, url: &str) -> Result<String> {
        let key = artifact_key(url)?;
        let bytes = self.fetcher.fetch_bytes(url).await?;
        self.store
            .put(self.bucket, &key, bytes, PDF_CONTENT_TYPE)
            .await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::FakeWeb;
    use bytes::Bytes;
    use tokio::time::Instant;

    fn links(urls: &[&str]) -> Vec<ArtifactLink> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn pdf_url(i: usize) -> String {
        format!("https://arxiv.org/pdf/2501.{i:05}")
    }

    #[test]
    fn test_partition_sizes() {
        for n in 0..25 {
            let items: Vec<String> = (0..n).map(pdf_url).collect();
            for batch_size in 1..8 {
                let chunks: Vec<_> = partition(&items, batch_size).collect();
                assert_eq!(chunks.len(), n.div_ceil(batch_size));
                assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), n);
                if let Some((_, full)) = chunks.split_last() {
                    assert!(full.iter().all(|c| c.len() == batch_size));
                }
                let flat: Vec<String> = chunks.concat();
                assert_eq!(flat, items);
            }
        }
    }

    #[test]
    fn test_partition_treats_zero_as_one() {
        let items = links(&["a", "b"]);
        assert_eq!(partition(&items, 0).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_chunks() {
        let urls: Vec<String> = (1..=5).map(pdf_url).collect();
        let web = urls
            .iter()
            .fold(FakeWeb::new(), |web, url| web.page(url, "%PDF"));
        let store = MemoryStore::new();
        let delay = Duration::from_secs(7);

        let started = Instant::now();
        let report = BatchUploader::new(&web, &store, "raw", 2, delay)
            .upload_all(&urls)
            .await;

        assert_eq!(started.elapsed(), delay * 2);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.stored, 5);
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_chunk_waits_for_slowest_member_and_delay() {
        let (a, b, c) = (pdf_url(1), pdf_url(2), pdf_url(3));
        let web = FakeWeb::new()
            .page(&a, "a")
            .page(&b, "b")
            .page(&c, "c")
            .latency(&a, Duration::from_secs(5));
        let store = MemoryStore::new();

        BatchUploader::new(&web, &store, "raw", 2, Duration::from_secs(1))
            .upload_all(&[a.clone(), b.clone(), c.clone()])
            .await;

        let calls = web.calls();
        let start_of = |url: &str| calls.iter().find(|(u, _)| u == url).unwrap().1;
        assert_eq!(start_of(&a), Duration::ZERO);
        assert_eq!(start_of(&b), Duration::ZERO);
        assert_eq!(start_of(&c), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_member_does_not_stop_chunk_or_run() {
        let (ok1, missing, ok2, next) = (pdf_url(1), pdf_url(2), pdf_url(3), pdf_url(4));
        let web = FakeWeb::new()
            .page(&ok1, "one")
            .status(&missing, 404)
            .page(&ok2, "three")
            .page(&next, "four");
        let store = MemoryStore::new();

        let started = Instant::now();
        let report = BatchUploader::new(&web, &store, "raw", 3, Duration::from_secs(2))
            .upload_all(&[ok1, missing, ok2, next])
            .await;

        assert_eq!(report.stored, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(
            store.keys("raw").await,
            vec!["2501.00001.pdf", "2501.00003.pdf", "2501.00004.pdf"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_member_failing_still_completes() {
        let web = FakeWeb::new();
        let store = MemoryStore::new();
        let urls: Vec<String> = (1..=4).map(pdf_url).collect();

        let report = BatchUploader::new(&web, &store, "raw", 2, Duration::from_secs(1))
            .upload_all(&urls)
            .await;

        assert_eq!(report.failed, 4);
        assert_eq!(report.chunks, 2);
        assert_eq!(web.calls().len(), 4);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_url_twice_overwrites_with_second_fetch() {
        let url = pdf_url(9);
        let web = FakeWeb::new().bodies(
            &url,
            vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")],
        );
        let store = MemoryStore::new();

        let report = BatchUploader::new(&web, &store, "raw", 1, Duration::from_secs(1))
            .upload_all(&[url.clone(), url.clone()])
            .await;

        assert_eq!(report.stored, 2);
        assert_eq!(store.len().await, 1);
        let object = store.object("raw", "2501.00009.pdf").await.unwrap();
        assert_eq!(object.bytes, Bytes::from_static(b"second"));
        assert_eq!(object.content_type, PDF_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_unkeyable_url_is_dropped_without_fetch() {
        let web = FakeWeb::new().page("https://arxiv.org/", "root");
        let store = MemoryStore::new();

        let report = BatchUploader::new(&web, &store, "raw", 5, Duration::ZERO)
            .upload_all(&links(&["https://arxiv.org/"]))
            .await;

        assert_eq!(report.failed, 1);
        assert!(web.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_runs_no_chunks() {
        let web = FakeWeb::new();
        let store = MemoryStore::new();
        let report = BatchUploader::new(&web, &store, "raw", 5, Duration::from_secs(60))
            .upload_all(&[])
            .await;
        assert_eq!(report, UploadReport::default());
    }
}
