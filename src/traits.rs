//! Strategy contract and failure taxonomy for site-agnostic scraping

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Listing;

/// Ways a scrape attempt against one source can fail.
///
/// Every variant is terminal for the attempt and resolves to an empty
/// contribution at the strategy boundary; none of them reach the
/// aggregation layer as a fault.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The source answered 404 for this search URL. Terminal, no fallback.
    #[error("page not found")]
    NotFound,
    /// Anti-bot defenses triggered, either by status code or by a
    /// recognizable block page served with 200.
    #[error("blocked by site")]
    Blocked,
    #[error("network error: {0}")]
    Network(String),
    /// Every known container selector came up empty, the markup has
    /// likely shifted under us.
    #[error("no known layout matched")]
    LayoutMismatch,
}

/// One pluggable extractor for a specific external listing site.
#[async_trait]
pub trait SourceStrategy: Send + Sync {
    /// Human-readable origin name used as the listing source label.
    fn source_name(&self) -> &str;

    /// Searches this source for vehicle listings.
    ///
    /// Never fails from the caller's perspective: fetch errors, block
    /// pages and layout drift all resolve to an empty vec, and a single
    /// malformed item never aborts extraction of the remaining items.
    async fn search(&self, query: &str, location: &str) -> Vec<Listing>;
}
