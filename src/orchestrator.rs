//! Run orchestrator: discovery → listing pages → flatten → batched upload.
//!
//! [`ScrapeRun::initialize`] performs discovery once; the resulting set of
//! listing pages is fixed for the lifetime of the run. [`ScrapeRun::run`]
//! then scrapes every listing page concurrently, flattens the per-page
//! results in listing order, and hands them to the [`BatchUploader`].
//!
//! Only a discovery failure reaches the caller. Page and item failures are
//! absorbed further down, so a run can finish having stored a subset of what
//! was listed, or nothing at all.
//!
//! Links are deduplicated within a page but not across pages: an artifact
//! listed under two subjects is fetched and stored twice, the second write
//! overwriting the first.

use crate::error::Result;
use crate::http::FetchBytes;
use crate::models::{ArtifactLink, ListingUrl, RunSummary};
use crate::scrapers::discovery::discover;
use crate::scrapers::listing::scrape_listing;
use crate::storage::ObjectStore;
use crate::uploader::BatchUploader;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Fixed inputs of a scrape run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub root_url: String,
    pub page_limit: usize,
    pub bucket: String,
}

/// One scrape run over a fixed set of listing pages.
#[derive(Debug)]
pub struct ScrapeRun<F, S> {
    session: F,
    store: S,
    settings: RunSettings,
    listing_urls: BTreeSet<ListingUrl>,
}

impl<F, S> ScrapeRun<F, S>
where
    F: FetchBytes,
    S: ObjectStore,
{
    /// Discover listing pages through `session`.
    ///
    /// # Errors
    ///
    /// Propagates the discovery fetch error; without listing pages there is
    /// nothing to run.
    #[instrument(level = "info", skip_all, fields(root = %settings.root_url))]
    pub async fn initialize(session: F, store: S, settings: RunSettings) -> Result<Self> {
        let listing_urls = discover(&session, &settings.root_url).await?;
        Ok(Self {
            session,
            store,
            settings,
            listing_urls,
        })
    }

    pub fn listing_urls(&self) -> &BTreeSet<ListingUrl> {
        &self.listing_urls
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scrape all listing pages, then upload their artifacts in chunks of
    /// `batch_size` with `delay` between chunks.
    #[instrument(level = "info", skip(self), fields(pages = self.listing_urls.len()))]
    pub async fn run(&self, batch_size: usize, delay: Duration) -> RunSummary {
        let pages = join_all(
            self.listing_urls
                .iter()
                .map(|url| scrape_listing(&self.session, url, self.settings.page_limit)),
        )
        .await;

        let pages_failed = pages.iter().filter(|page| page.is_none()).count();
        let links: Vec<ArtifactLink> = pages.into_iter().flatten().flatten().collect();
        info!(
            pages = self.listing_urls.len(),
            pages_failed,
            links = links.len(),
            "Collected artifact links"
        );
        debug!(?links, "Artifact links");

        let upload = BatchUploader::new(
            &self.session,
            &self.store,
            &self.settings.bucket,
            batch_size,
            delay,
        )
        .upload_all(&links)
        .await;

        RunSummary {
            listing_pages: self.listing_urls.len(),
            pages_failed,
            links_collected: links.len(),
            upload,
        }
    }
}
