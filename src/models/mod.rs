//! Data models for aggregated vehicle listings

use serde::{Deserialize, Serialize};

/// A normalized vehicle listing scraped from one source site.
///
/// Only ever constructed with a non-empty title and detail link; items
/// missing either are dropped during extraction. The price is kept as the
/// raw display string shown by the source, parsing happens on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: String,
    pub year: i32,
    pub km: u32,
    pub link: String,
    pub source: String,
    pub image_url: String,
}

/// Parameters of one aggregation call. No persisted identity.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub max_price: Option<f64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            max_price: None,
        }
    }

    pub fn with_max_price(mut self, ceiling: f64) -> Self {
        self.max_price = Some(ceiling);
        self
    }
}
