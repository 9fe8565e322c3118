//! Mercado Livre marketplace scraper

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::fetch::{PageFetcher, is_block_page, page_title};
use crate::models::Listing;
use crate::parser;
use crate::scrapers::{select_attr, select_containers, select_image_url, select_text, select_texts};
use crate::traits::{ScrapeError, SourceStrategy};

const SOURCE_NAME: &str = "Mercado Livre";
const BASE_URL: &str = "https://carros.mercadolivre.com.br";

/// Layout markers seen across Mercado Livre frontend revisions, newest
/// first. The poly-* classes are the current design system, ui-search-*
/// and andes-* are still served on some result pages.
const CONTAINER_CASCADE: &[&str] = &[
    "li.ui-search-layout__item",
    "div.ui-search-result__wrapper",
    "div.andes-card",
    "div.poly-card",
];

const TITLE_SELECTOR: &str = "a.poly-component__title, h2.ui-search-item__title";
const LINK_SELECTOR: &str = "a.poly-component__title, a.ui-search-link";
const PRICE_SELECTOR: &str = "span.andes-money-amount__fraction";
const IMAGE_SELECTOR: &str = "img.poly-component__picture, img.ui-search-result-image__element";
const ATTRIBUTES_SELECTOR: &str =
    "li.poly-attributes_list__item, li.ui-search-card-attributes__attribute";

/// Locations that mean "whole country", for which the URL carries no
/// location segment.
const GENERIC_LOCATIONS: &[&str] = &["", "sp", "brasil"];

pub struct MercadoLivreScraper {
    fetcher: PageFetcher,
}

impl MercadoLivreScraper {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    fn build_url(query: &str, location: &str) -> String {
        let term = query.trim().replace(' ', "-");
        let loc = location.trim().replace(' ', "-");

        if GENERIC_LOCATIONS.contains(&loc.to_lowercase().as_str()) {
            format!("{BASE_URL}/{term}")
        } else {
            format!("{BASE_URL}/{loc}/{term}")
        }
    }

    async fn scrape_url(&self, url: &str) -> Result<Vec<Listing>, ScrapeError> {
        info!("Mercado Livre target: {url}");
        let document = self.fetcher.get_document(url).await?;

        if is_block_page(&page_title(&document)) {
            warn!("Mercado Livre served a block page, aborting this attempt");
            return Err(ScrapeError::Blocked);
        }

        Self::extract(&document)
    }

    /// Extracts every listing the document's item containers hold. One
    /// malformed item is skipped without affecting its neighbours.
    fn extract(document: &Html) -> Result<Vec<Listing>, ScrapeError> {
        let items = select_containers(document, CONTAINER_CASCADE);
        if items.is_empty() {
            return Err(ScrapeError::LayoutMismatch);
        }
        debug!("Mercado Livre containers found: {}", items.len());

        let listings = items
            .iter()
            .filter_map(|item| {
                let title = select_text(item, TITLE_SELECTOR);
                let link = select_attr(item, LINK_SELECTOR, "href");

                // Items without a title or detail link are not surfaced
                if title.is_empty() || link.is_empty() {
                    return None;
                }

                let mut price = select_text(item, PRICE_SELECTOR);
                if price.is_empty() {
                    price = "0".to_string();
                }

                // Year and odometer live in separate attribute entries;
                // km is read from its own entry so year digits never
                // bleed into the distance.
                let attributes = select_texts(item, ATTRIBUTES_SELECTOR);
                let year = parser::extract_year(&attributes.join(" "));
                let km = attributes
                    .iter()
                    .find(|attr| attr.to_lowercase().contains("km"))
                    .map(|attr| parser::extract_km(attr))
                    .unwrap_or(0);

                Some(Listing {
                    title: parser::sanitize_title(Some(&title)),
                    price: format!("R$ {price}"),
                    year,
                    km,
                    link,
                    source: SOURCE_NAME.to_string(),
                    image_url: select_image_url(item, IMAGE_SELECTOR),
                })
            })
            .collect();

        Ok(listings)
    }
}

#[async_trait]
impl SourceStrategy for MercadoLivreScraper {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, location: &str) -> Vec<Listing> {
        let primary = Self::build_url(query, location);

        match self.scrape_url(&primary).await {
            Ok(listings) if !listings.is_empty() => {
                info!("Mercado Livre contributed {} listings", listings.len());
                return listings;
            }
            Err(ScrapeError::NotFound) => {
                info!("Mercado Livre has no page for this search");
                return Vec::new();
            }
            Ok(_) => debug!("Mercado Livre primary URL matched zero items"),
            Err(e) => warn!("Mercado Livre primary attempt failed: {e}"),
        }

        // The location segment is the usual culprit, retry country-wide
        let fallback = Self::build_url(query, "");
        if fallback == primary {
            return Vec::new();
        }

        match self.scrape_url(&fallback).await {
            Ok(listings) => {
                info!("Mercado Livre fallback contributed {} listings", listings.len());
                listings
            }
            Err(e) => {
                warn!("Mercado Livre fallback attempt failed: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r#"
        <html><head><title>Carros no Mercado Livre</title></head><body>
        <ol>
          <li class="ui-search-layout__item">
            <a class="poly-component__title" href="https://carro.example/civic-1">Honda  Civic EXL</a>
            <span class="andes-money-amount__fraction">85.000</span>
            <img class="poly-component__picture" src="https://http2.mlstatic.com/civic.webp">
            <ul>
              <li class="poly-attributes_list__item">2019</li>
              <li class="poly-attributes_list__item">60.000 Km</li>
            </ul>
          </li>
          <li class="ui-search-layout__item">
            <a class="poly-component__title" href="https://carro.example/civic-2">Honda Civic LX</a>
          </li>
          <li class="ui-search-layout__item">
            <span class="andes-money-amount__fraction">30.000</span>
          </li>
        </ol>
        </body></html>"#;

    #[test]
    fn extracts_fields_from_current_layout() {
        let document = Html::parse_document(RESULT_PAGE);
        let listings = MercadoLivreScraper::extract(&document).unwrap();

        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.title, "Honda Civic EXL");
        assert_eq!(first.price, "R$ 85.000");
        assert_eq!(first.year, 2019);
        assert_eq!(first.km, 60000);
        assert_eq!(first.link, "https://carro.example/civic-1");
        assert_eq!(first.source, "Mercado Livre");
        assert_eq!(first.image_url, "https://http2.mlstatic.com/civic.webp");
    }

    #[test]
    fn item_without_link_is_dropped_not_fatal() {
        let document = Html::parse_document(RESULT_PAGE);
        let listings = MercadoLivreScraper::extract(&document).unwrap();
        // third container has no title/link and must not abort the others
        assert!(listings.iter().all(|l| !l.link.is_empty()));
    }

    #[test]
    fn missing_price_defaults_to_zero() {
        let document = Html::parse_document(RESULT_PAGE);
        let listings = MercadoLivreScraper::extract(&document).unwrap();
        assert_eq!(listings[1].price, "R$ 0");
        assert_eq!(listings[1].year, parser::FALLBACK_YEAR);
        assert_eq!(listings[1].km, 0);
    }

    #[test]
    fn legacy_layout_is_reached_through_cascade() {
        let html = r#"
            <html><body>
            <div class="ui-search-result__wrapper">
              <h2 class="ui-search-item__title">Fiat Argo</h2>
              <a class="ui-search-link" href="https://carro.example/argo"></a>
              <span class="andes-money-amount__fraction">52.900</span>
            </div>
            </body></html>"#;
        let document = Html::parse_document(html);
        let listings = MercadoLivreScraper::extract(&document).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Fiat Argo");
    }

    #[test]
    fn unknown_layout_is_a_mismatch() {
        let document = Html::parse_document("<html><body><p>novo layout</p></body></html>");
        assert!(matches!(
            MercadoLivreScraper::extract(&document),
            Err(ScrapeError::LayoutMismatch)
        ));
    }

    #[test]
    fn url_elides_generic_locations() {
        assert_eq!(
            MercadoLivreScraper::build_url("Civic", "SP"),
            "https://carros.mercadolivre.com.br/Civic"
        );
        assert_eq!(
            MercadoLivreScraper::build_url("Civic", "brasil"),
            "https://carros.mercadolivre.com.br/Civic"
        );
        assert_eq!(
            MercadoLivreScraper::build_url("onix plus", "minas gerais"),
            "https://carros.mercadolivre.com.br/minas-gerais/onix-plus"
        );
    }
}
