use std::sync::Arc;

use anyhow::Result;
use tracing::info;

mod aggregator;
mod fetch;
mod models;
mod parser;
mod scrapers;
mod traits;

use aggregator::Aggregator;
use fetch::PageFetcher;
use models::SearchRequest;
use scrapers::{MercadoLivreScraper, SoCarraoScraper};
use traits::SourceStrategy;

const DEFAULT_QUERY: &str = "Civic";
const DEFAULT_LOCATION: &str = "SP";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let request = parse_args(std::env::args().skip(1))?;

    let fetcher = PageFetcher::new()?;
    let strategies: Vec<Arc<dyn SourceStrategy>> = vec![
        Arc::new(MercadoLivreScraper::new(fetcher.clone())),
        Arc::new(SoCarraoScraper::new(fetcher)),
    ];

    let aggregator = Aggregator::new(strategies);

    info!(
        "searching for {:?} in {:?} (max price: {:?})",
        request.query, request.location, request.max_price
    );

    let listings = aggregator.search_all(&request).await;

    // An empty result may equally mean no offers or all sources blocked;
    // either way it is a valid, empty response.
    println!("{}", serde_json::to_string_pretty(&listings)?);

    Ok(())
}

/// `autoradar [query] [location] [--max-price N]`
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<SearchRequest> {
    let mut positional = Vec::new();
    let mut max_price = None;

    while let Some(arg) = args.next() {
        if arg == "--max-price" {
            let value = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--max-price needs a value"))?;
            max_price = Some(value.parse::<f64>()?);
        } else {
            positional.push(arg);
        }
    }

    let query = positional
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());
    let location = positional
        .get(1)
        .cloned()
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    let mut request = SearchRequest::new(query, location);
    request.max_price = max_price;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn defaults_apply_when_no_args_given() {
        let request = parse_args(args(&[])).unwrap();
        assert_eq!(request.query, DEFAULT_QUERY);
        assert_eq!(request.location, DEFAULT_LOCATION);
        assert_eq!(request.max_price, None);
    }

    #[test]
    fn positional_and_flag_args_parse() {
        let request = parse_args(args(&["Onix 2023", "Curitiba", "--max-price", "80000"])).unwrap();
        assert_eq!(request.query, "Onix 2023");
        assert_eq!(request.location, "Curitiba");
        assert_eq!(request.max_price, Some(80000.0));
    }

    #[test]
    fn max_price_without_value_is_an_error() {
        assert!(parse_args(args(&["Civic", "--max-price"])).is_err());
    }
}
