//! Scrapers for the listing site.
//!
//! Scraping happens in two phases:
//!
//! 1. **Discovery** ([`discovery`]): fetch the site root once and collect the
//!    "recent submissions" listing page of every subject section.
//! 2. **Listing pages** ([`listing`]): fetch each listing page and collect up
//!    to `limit` PDF links from it.
//!
//! Both phases parse with `scraper` and walk the parsed tree forward only.
//! Discovery failures are fatal to a run; listing page failures are logged
//! and the page contributes no links.

pub mod discovery;
pub mod listing;

use scraper::{ElementRef, Selector};

/// Return the first following sibling element of `element` that satisfies
/// `predicate`.
///
/// The walk only moves forward through siblings and skips text nodes. It may
/// pass over elements of other kinds, so a heading without its own list will
/// pick up the next list in the same parent.
pub(crate) fn next_sibling_element<'a>(
    element: ElementRef<'a>,
    predicate: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| predicate(sibling))
}

/// Parse a selector that is known at compile time.
pub(crate) fn static_selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}
