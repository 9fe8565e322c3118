//! Per-site scraper strategies and the selector-cascade helpers they share.
//!
//! Listing sites change markup without notice, so nothing here assumes a
//! single layout: every structural lookup is an ordered cascade of known
//! current and historical selectors, stopping at the first that matches.

use scraper::{ElementRef, Html, Selector};

pub mod mercado_livre;
pub mod socarrao;

pub use mercado_livre::MercadoLivreScraper;
pub use socarrao::SoCarraoScraper;

/// Runs a cascade of container selectors over the document, returning the
/// matches of the first selector that yields at least one element. An
/// empty vec means no known layout applies.
pub fn select_containers<'a>(document: &'a Html, cascade: &[&str]) -> Vec<ElementRef<'a>> {
    for raw in cascade {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let matches: Vec<_> = document.select(&selector).collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

/// Collected text of the first element matching the selector, trimmed.
/// Empty string when nothing matches.
pub fn select_text(item: &ElementRef<'_>, raw_selector: &str) -> String {
    let Ok(selector) = Selector::parse(raw_selector) else {
        return String::new();
    };
    item.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Trimmed text of every element matching the selector, in document
/// order. Used for attribute lists spread over several `<li>`s.
pub fn select_texts(item: &ElementRef<'_>, raw_selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(raw_selector) else {
        return Vec::new();
    };
    item.select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect()
}

/// Attribute value of the first element matching the selector, empty
/// string when absent.
pub fn select_attr(item: &ElementRef<'_>, raw_selector: &str, attr: &str) -> String {
    let Ok(selector) = Selector::parse(raw_selector) else {
        return String::new();
    };
    item.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .unwrap_or_default()
        .to_string()
}

/// Image URL for an item, preferring the primary `src` but falling back
/// to the deferred-loading `data-src` when `src` is missing or an inline
/// placeholder data URI.
pub fn select_image_url(item: &ElementRef<'_>, primary_selector: &str) -> String {
    let src = select_attr(item, primary_selector, "src");
    if src.is_empty() || src.contains("data:image") {
        return select_attr(item, "img", "data-src");
    }
    src
}
