//! SóCarrão dealer-network scraper
//!
//! The site renders visual vehicle cards without anchor links; canonical
//! detail URLs only exist in a JSON-LD `ItemList` block embedded in the
//! document head. Cards and URLs are correlated purely by position, which
//! holds as long as the site emits both in the same order.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::fetch::{PageFetcher, is_block_page, page_title};
use crate::models::Listing;
use crate::parser;
use crate::scrapers::{select_containers, select_image_url, select_text, select_texts};
use crate::traits::{ScrapeError, SourceStrategy};

const SOURCE_NAME: &str = "SóCarrão";
const BASE_URL: &str = "https://www.socarrao.com.br";

const CARD_CASCADE: &[&str] = &["div.vehicle-card"];

static JSONLD_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""url":"(https://www\.socarrao\.com\.br/[^"]+)""#).expect("url regex is valid")
});

pub struct SoCarraoScraper {
    fetcher: PageFetcher,
}

impl SoCarraoScraper {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Splits a detected 4-digit year token out of the free-text query,
    /// returning the cleaned query and the token.
    fn split_year(query: &str) -> (String, Option<String>) {
        match parser::find_year(query) {
            Some(year) => {
                let year = year.to_string();
                let clean = query.replacen(&year, "", 1);
                let clean = clean.split_whitespace().collect::<Vec<_>>().join(" ");
                (clean, Some(year))
            }
            None => (query.trim().to_string(), None),
        }
    }

    fn has_real_location(location: &str) -> bool {
        let loc = location.trim();
        !loc.is_empty() && !loc.eq_ignore_ascii_case("brasil")
    }

    /// Generic search form: everything goes into the `q` parameter,
    /// form-encoded with `+` for spaces.
    fn search_url(terms: &[&str]) -> String {
        let term = terms
            .iter()
            .filter(|t| !t.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let encoded = urlencoding::encode(&term).replace("%20", "+");
        format!("{BASE_URL}/buscar?q={encoded}")
    }

    /// Friendly path form: lowercased model words become path segments,
    /// with the year appended as its own segment.
    fn friendly_url(clean_query: &str, year: Option<&str>) -> String {
        let model_path: String = clean_query
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
            .collect::<String>()
            .trim()
            .replace(' ', "/");

        let mut url = format!("{BASE_URL}/{model_path}");
        if let Some(year) = year {
            url.push('/');
            url.push_str(year);
        }
        url
    }

    async fn scrape_url(&self, url: &str) -> Result<Vec<Listing>, ScrapeError> {
        info!("SóCarrão target: {url}");
        let document = self.fetcher.get_document(url).await?;

        if is_block_page(&page_title(&document)) {
            warn!("SóCarrão served a block page, aborting this attempt");
            return Err(ScrapeError::Blocked);
        }

        Self::extract(&document)
    }

    /// Pulls canonical detail URLs out of the JSON-LD `ItemList` block,
    /// in document order.
    fn extract_jsonld_links(document: &Html) -> Vec<String> {
        let selector = Selector::parse(r#"script[type="application/ld+json"]"#)
            .expect("json-ld selector is valid");

        let mut links = Vec::new();
        for script in document.select(&selector) {
            let json = script.text().collect::<String>();
            if !json.contains("ItemList") || !json.contains("itemListElement") {
                continue;
            }
            for capture in JSONLD_URL_RE.captures_iter(&json) {
                links.push(capture[1].to_string());
            }
        }
        links
    }

    fn extract(document: &Html) -> Result<Vec<Listing>, ScrapeError> {
        let cards = select_containers(document, CARD_CASCADE);
        if cards.is_empty() {
            return Err(ScrapeError::LayoutMismatch);
        }

        let links = Self::extract_jsonld_links(document);
        debug!(
            "SóCarrão visual cards: {}, JSON-LD links: {}",
            cards.len(),
            links.len()
        );

        // Positional pairing: card i gets link i. Only the overlap of the
        // two lists is usable.
        let listings = cards
            .iter()
            .zip(links)
            .filter_map(|(card, link)| {
                let brand = select_text(card, ".brand-model-formatter__brand");
                let model = select_text(card, ".brand-model-formatter__model");
                let version = select_text(card, ".vehicle-card__right--version");

                let mut title = format!("{brand} {model} {version}").trim().to_string();
                if title.is_empty() {
                    title = select_text(card, "h2, h3");
                }
                if title.is_empty() || link.is_empty() {
                    return None;
                }

                let mut price = select_text(card, ".vehicle-card__right--price .title-semibold");
                if price.is_empty() {
                    price = select_text(card, ".vehicle-card__priceSection--value .title-semibold");
                }
                if price.is_empty() {
                    price = "Sob Consulta".to_string();
                } else if !price.contains("R$") {
                    price = format!("R$ {price}");
                }

                // Specs list: year first ("2023/2024" means model year on
                // the left), km wherever its marker shows up.
                let specs = select_texts(card, ".vehicle-card__right--specs li");
                let year = specs
                    .first()
                    .map(|s| parser::extract_year(s.split('/').next().unwrap_or(s)))
                    .unwrap_or(parser::FALLBACK_YEAR);
                let km = specs
                    .iter()
                    .find(|s| s.to_lowercase().contains("km"))
                    .map(|s| parser::extract_km(s))
                    .unwrap_or(0);

                let mut loc = select_text(card, ".vehicle-card__left--location span");
                if loc.is_empty() {
                    loc = select_text(card, ".vehicle-card__right--location span");
                }
                let source = if loc.is_empty() {
                    SOURCE_NAME.to_string()
                } else {
                    format!("{SOURCE_NAME} ({loc})")
                };

                Some(Listing {
                    title: parser::sanitize_title(Some(&title)),
                    price,
                    year,
                    km,
                    link,
                    source,
                    image_url: select_image_url(card, "img"),
                })
            })
            .collect();

        Ok(listings)
    }
}

#[async_trait]
impl SourceStrategy for SoCarraoScraper {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, location: &str) -> Vec<Listing> {
        let (clean, year) = Self::split_year(query);
        let has_location = Self::has_real_location(location);

        let primary = if has_location {
            Self::search_url(&[clean.as_str(), year.as_deref().unwrap_or(""), location.trim()])
        } else {
            Self::friendly_url(&clean, year.as_deref())
        };

        match self.scrape_url(&primary).await {
            Ok(listings) if !listings.is_empty() => {
                info!("SóCarrão contributed {} listings", listings.len());
                return listings;
            }
            Err(ScrapeError::NotFound) => {
                info!("SóCarrão has no page for this search");
                return Vec::new();
            }
            Ok(_) => debug!("SóCarrão primary URL matched zero items"),
            Err(e) => warn!("SóCarrão primary attempt failed: {e}"),
        }

        if has_location {
            // The search form already carried everything we know
            return Vec::new();
        }

        let fallback = Self::search_url(&[clean.as_str(), year.as_deref().unwrap_or("")]);
        match self.scrape_url(&fallback).await {
            Ok(listings) => {
                info!("SóCarrão fallback contributed {} listings", listings.len());
                listings
            }
            Err(e) => {
                warn!("SóCarrão fallback attempt failed: {e}");
                Vec::new()
            }
        }
    }
}
