//! HTTP document fetching with best-effort browser mimicry.
//!
//! One shared `reqwest::Client` behind a thin wrapper that classifies
//! failures into the scrape taxonomy and hands back a parsed document.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::debug;

use crate::traits::ScrapeError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(12);

/// Modern desktop user-agents, one picked at random per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

/// Markers that show up in the titles of known block/challenge pages.
const BLOCK_MARKERS: &[&str] = &["captcha", "segurança", "seguranca", "security", "robot"];

/// Shared document fetcher. Cheap to clone, holds no mutable state, safe
/// to use from any number of concurrent strategy tasks.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// Fetches a URL and parses the body into a document tree.
    ///
    /// 404 means this search has no page at all and is reported as
    /// `NotFound`; 403/429 as `Blocked`; anything else non-successful,
    /// plus transport errors and timeouts, as `Network`.
    pub async fn get_document(&self, url: &str) -> Result<Html, ScrapeError> {
        debug!("fetching {url}");

        let response = self
            .client
            .get(url)
            .headers(browser_headers())
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ScrapeError::NotFound),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(ScrapeError::Blocked),
            status if !status.is_success() => {
                Err(ScrapeError::Network(format!("http status {status}")))
            }
            _ => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ScrapeError::Network(e.to_string()))?;
                Ok(Html::parse_document(&body))
            }
        }
    }
}

/// Builds a realistic browser header set with a randomized user-agent.
/// Locale headers target pt-BR sources; the referer claims a Google
/// arrival, which several sites treat more leniently.
pub fn browser_headers() -> HeaderMap {
    let user_agent = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let mut headers = HeaderMap::new();
    let entries = [
        ("User-Agent", user_agent),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
        ("Referer", "https://www.google.com/"),
        (
            "Sec-Ch-Ua",
            "\"Google Chrome\";v=\"123\", \"Not:A-Brand\";v=\"8\", \"Chromium\";v=\"123\"",
        ),
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Sec-Ch-Ua-Platform", "\"Windows\""),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "cross-site"),
        ("Sec-Fetch-User", "?1"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Cache-Control", "max-age=0"),
        ("DNT", "1"),
    ];

    for (name, value) in entries {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }

    headers
}

/// Reads the document `<title>`, empty string when there is none.
pub fn page_title(document: &Html) -> String {
    let selector = Selector::parse("title").expect("title selector is valid");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
}

/// True when a page title looks like an anti-bot challenge rather than
/// real listing content.
pub fn is_block_page(title: &str) -> bool {
    let title = title.to_lowercase();
    BLOCK_MARKERS.iter().any(|marker| title.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_markers_are_case_insensitive() {
        assert!(is_block_page("Preencha o CAPTCHA para continuar"));
        assert!(is_block_page("Verificação de segurança"));
        assert!(is_block_page("Security check"));
        assert!(!is_block_page("Carros usados e novos"));
        assert!(!is_block_page(""));
    }

    #[test]
    fn title_extracted_from_document() {
        let doc = Html::parse_document("<html><head><title>Hello</title></head></html>");
        assert_eq!(page_title(&doc), "Hello");

        let untitled = Html::parse_document("<html><body>x</body></html>");
        assert_eq!(page_title(&untitled), "");
    }

    #[test]
    fn headers_always_carry_an_identity() {
        let headers = browser_headers();
        let ua = headers.get("User-Agent").unwrap().to_str().unwrap();
        assert!(ua.starts_with("Mozilla/5.0"));
        assert!(headers.contains_key("Accept-Language"));
    }
}
