//! Listing discovery: find the "recent submissions" page of every subject.
//!
//! The site root lists subject areas under `<h2>` headings, each followed by a
//! `<ul>` whose entries link to that subject's listing pages. The first and
//! last headings are not subject areas and are skipped. Inside each list, only
//! links whose text is exactly `recent` are kept.

use super::{next_sibling_element, static_selector};
use crate::error::Result;
use crate::http::FetchBytes;
use crate::models::ListingUrl;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, info, instrument};
use url::Url;

/// Link text that marks a "recent submissions" entry.
pub const RECENT_MARKER: &str = "recent";

static HEADING: LazyLock<Selector> = LazyLock::new(|| static_selector("h2"));
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| static_selector("li"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| static_selector("a"));

/// Fetch the site root and collect every subject's recent-listing URL.
///
/// Runs once, before any listing page is scraped.
///
/// # Errors
///
/// A fetch error if the root page cannot be retrieved or answers with a
/// non-success status. Finding no subject sections is not an error.
#[instrument(level = "info", skip(fetcher))]
pub async fn discover<F: FetchBytes>(fetcher: &F, root_url: &str) -> Result<BTreeSet<ListingUrl>> {
    let body = fetcher.fetch_bytes(root_url).await?;
    let html = String::from_utf8_lossy(&body);
    let links = parse_listing_urls(&html, root_url);

    info!(count = links.len(), source = root_url, "Discovered listing pages");
    debug!(urls = ?links, "Listing URLs");
    Ok(links)
}

/// Extract recent-listing URLs from the root page HTML.
///
/// Every returned URL begins with `root_url`.
pub fn parse_listing_urls(html: &str, root_url: &str) -> BTreeSet<ListingUrl> {
    let document = Html::parse_document(html);
    let headings: Vec<ElementRef> = document.select(&HEADING).collect();
    let mut links = BTreeSet::new();

    if headings.len() < 2 {
        return links;
    }

    for heading in &headings[1..headings.len() - 1] {
        let Some(list) = next_sibling_element(*heading, |el| el.value().name() == "ul") else {
            continue;
        };

        for item in list.select(&LIST_ITEM) {
            let recent = item
                .select(&ANCHOR)
                .find(|a| a.text().collect::<String>().trim() == RECENT_MARKER);
            let Some(href) = recent.and_then(|a| a.value().attr("href")) else {
                continue;
            };

            match absolutize(root_url, href) {
                Some(full_url) => {
                    debug!(%full_url, "Found recent link");
                    links.insert(full_url);
                }
                None => debug!(%href, "Skipping recent link outside the root site"),
            }
        }
    }

    links
}

/// Prefix a relative `href` with the root URL.
///
/// Absolute hrefs are kept only when they point at a path under the root.
/// Whatever is returned begins with `root_url` exactly as given.
fn absolutize(root_url: &str, href: &str) -> Option<String> {
    let root = root_url.trim_end_matches('/');

    let candidate = if href.starts_with("//") || Url::parse(href).is_ok() {
        let rest = href.strip_prefix(root)?;
        if !rest.starts_with('/') {
            return None;
        }
        href.to_string()
    } else if href.starts_with('/') {
        format!("{root}{href}")
    } else {
        format!("{root}/{href}")
    };

    candidate.starts_with(root_url).then_some(candidate)
}
