//! Listing page scraper.
//!
//! A listing page enumerates recent submissions as `<dt>`/`<dd>` pairs. The
//! `<dt>` of each pair carries the item's links, among them one titled
//! `Download PDF`. Links are resolved against the listing page URL, so
//! `/pdf/2501.01234` on `https://arxiv.org/list/cs.AI/recent` becomes
//! `https://arxiv.org/pdf/2501.01234`.

use super::static_selector;
use crate::error::{PipelineError, Result};
use crate::http::FetchBytes;
use crate::models::ArtifactLink;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Default number of links kept per listing page.
pub const DEFAULT_PAGE_LIMIT: usize = 5;

static TERM: LazyLock<Selector> = LazyLock::new(|| static_selector("dt"));
static DETAIL: LazyLock<Selector> = LazyLock::new(|| static_selector("dd"));
static PDF_LINK: LazyLock<Selector> =
    LazyLock::new(|| static_selector(r#"a[title="Download PDF"]"#));

/// Fetch one listing page and collect at most `limit` unique PDF links.
///
/// Fetch failures are logged and reported as `None`; they never fail the
/// caller. Entries beyond `limit` are dropped, not paginated.
#[instrument(level = "info", skip(fetcher))]
pub async fn scrape_listing<F: FetchBytes>(
    fetcher: &F,
    url: &str,
    limit: usize,
) -> Option<Vec<ArtifactLink>> {
    let body = match fetcher.fetch_bytes(url).await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, %url, "Listing page fetch failed");
            return None;
        }
    };

    let html = String::from_utf8_lossy(&body);
    let links = match extract_artifact_links(&html, url, limit) {
        Ok(links) => links,
        Err(e) => {
            error!(error = %e, %url, "Listing page could not be parsed");
            return None;
        }
    };
    info!(count = links.len(), %url, "Scraped listing page");
    Some(links)
}

/// Extract PDF links from listing page HTML, in document order.
///
/// The result holds no duplicates and never more than `limit` entries.
///
/// # Errors
///
/// [`PipelineError::Parse`] if `page_url` is not absolute, since relative
/// links on the page could not be resolved.
pub fn extract_artifact_links(
    html: &str,
    page_url: &str,
    limit: usize,
) -> Result<Vec<ArtifactLink>> {
    let base = Url::parse(page_url).map_err(|e| PipelineError::Parse {
        what: format!("listing url {page_url}"),
        reason: e.to_string(),
    })?;

    let document = Html::parse_document(html);
    let mut links: Vec<ArtifactLink> = Vec::new();

    for (term, _detail) in document.select(&TERM).zip(document.select(&DETAIL)) {
        if links.len() >= limit {
            debug!(limit, "Per-page limit reached");
            break;
        }

        let resolved = term
            .select(&PDF_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| base.join(href).ok())
            .map(String::from);

        if let Some(link) = resolved {
            if !links.contains(&link) {
                debug!(%link, "Found PDF link");
                links.push(link);
            }
        }
    }

    Ok(links)
}
