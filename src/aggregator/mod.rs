//! Concurrent fan-out over every registered source strategy.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::models::{Listing, SearchRequest};
use crate::parser;
use crate::traits::SourceStrategy;

/// Upper bound on one aggregation call. A hung source past its own fetch
/// timeout must not stall the whole response.
const CALL_DEADLINE: Duration = Duration::from_secs(30);

/// Fans a search out to all registered strategies in parallel, then
/// merges, filters and sorts their contributions.
///
/// The registry is fixed at construction and passed in explicitly; there
/// is no global strategy state.
pub struct Aggregator {
    strategies: Vec<Arc<dyn SourceStrategy>>,
    deadline: Duration,
}

impl Aggregator {
    pub fn new(strategies: Vec<Arc<dyn SourceStrategy>>) -> Self {
        Self {
            strategies,
            deadline: CALL_DEADLINE,
        }
    }

    #[cfg(test)]
    fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Runs one full aggregation.
    ///
    /// Never fails: a strategy that panics, hangs past the deadline or
    /// returns nothing simply contributes zero listings. An all-empty
    /// result is indistinguishable from a genuinely empty market, which
    /// is a documented limitation of the sources themselves.
    pub async fn search_all(&self, request: &SearchRequest) -> Vec<Listing> {
        info!(
            "aggregating {} sources for query={:?} location={:?}",
            self.strategies.len(),
            request.query,
            request.location
        );

        let handles: Vec<_> = self
            .strategies
            .iter()
            .map(|strategy| {
                let strategy = Arc::clone(strategy);
                let query = request.query.clone();
                let location = request.location.clone();
                let deadline = self.deadline;
                let name = strategy.source_name().to_string();
                tokio::spawn(async move {
                    match timeout(deadline, strategy.search(&query, &location)).await {
                        Ok(listings) => listings,
                        Err(_) => {
                            warn!("source {name} exceeded the call deadline, dropping it");
                            Vec::new()
                        }
                    }
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(listings) => all.extend(listings),
                // A panicking strategy is isolated to its own task
                Err(e) => warn!("source task failed: {e}"),
            }
        }

        if let Some(ceiling) = request.max_price {
            // A price that does not parse cannot be shown to be under the
            // ceiling, so it is excluded rather than kept as unknown.
            all.retain(|listing| {
                parser::parse_price(&listing.price).is_some_and(|value| value <= ceiling)
            });
        }

        all.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));

        info!("aggregation produced {} listings", all.len());
        all
    }
}

/// Ascending-price sort key; unparsable prices sort after everything.
fn sort_key(listing: &Listing) -> f64 {
    parser::parse_price(&listing.price).unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn listing(price: &str) -> Listing {
        Listing {
            title: format!("Car at {price}"),
            price: price.to_string(),
            year: 2020,
            km: 50000,
            link: "https://example.com/car".to_string(),
            source: "Test".to_string(),
            image_url: String::new(),
        }
    }

    struct FixedSource(Vec<Listing>);

    #[async_trait]
    impl SourceStrategy for FixedSource {
        fn source_name(&self) -> &str {
            "Fixed"
        }
        async fn search(&self, _query: &str, _location: &str) -> Vec<Listing> {
            self.0.clone()
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl SourceStrategy for PanickingSource {
        fn source_name(&self) -> &str {
            "Panicking"
        }
        async fn search(&self, _query: &str, _location: &str) -> Vec<Listing> {
            panic!("simulated strategy fault")
        }
    }

    struct HangingSource;

    #[async_trait]
    impl SourceStrategy for HangingSource {
        fn source_name(&self) -> &str {
            "Hanging"
        }
        async fn search(&self, _query: &str, _location: &str) -> Vec<Listing> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            vec![listing("R$ 1,00")]
        }
    }

    fn request() -> SearchRequest {
        SearchRequest::new("Civic", "SP")
    }

    #[tokio::test]
    async fn failing_source_does_not_affect_the_others() {
        let good = vec![listing("R$ 40.000"), listing("R$ 35.000")];
        let aggregator = Aggregator::new(vec![
            Arc::new(PanickingSource),
            Arc::new(FixedSource(good.clone())),
        ]);

        let result = aggregator.search_all(&request()).await;

        assert_eq!(result.len(), good.len());
        assert_eq!(result[0].price, "R$ 35.000");
        assert_eq!(result[1].price, "R$ 40.000");
    }

    #[tokio::test]
    async fn hung_source_is_dropped_at_the_deadline() {
        let aggregator = Aggregator::new(vec![
            Arc::new(HangingSource),
            Arc::new(FixedSource(vec![listing("R$ 10.000")])),
        ])
        .with_deadline(Duration::from_millis(100));

        let result = aggregator.search_all(&request()).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].price, "R$ 10.000");
    }

    #[tokio::test]
    async fn ceiling_filter_excludes_unparsable_prices() {
        let aggregator = Aggregator::new(vec![Arc::new(FixedSource(vec![
            listing("R$ 10.000"),
            listing("Sob Consulta"),
            listing("R$ 20.000"),
        ]))]);

        let result = aggregator
            .search_all(&request().with_max_price(15000.0))
            .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].price, "R$ 10.000");
    }

    #[tokio::test]
    async fn unparsable_prices_always_sort_last() {
        let aggregator = Aggregator::new(vec![Arc::new(FixedSource(vec![
            listing("R$ 30.000"),
            listing("Sob Consulta"),
            listing("R$ 10.000"),
        ]))]);

        let result = aggregator.search_all(&request()).await;

        let prices: Vec<_> = result.iter().map(|l| l.price.as_str()).collect();
        assert_eq!(prices, ["R$ 10.000", "R$ 30.000", "Sob Consulta"]);
    }

    #[tokio::test]
    async fn no_dedup_across_sources() {
        let same = vec![listing("R$ 25.000")];
        let aggregator = Aggregator::new(vec![
            Arc::new(FixedSource(same.clone())),
            Arc::new(FixedSource(same)),
        ]);

        let result = aggregator.search_all(&request()).await;
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_result() {
        let aggregator = Aggregator::new(Vec::new());
        assert!(aggregator.search_all(&request()).await.is_empty());
    }
}
