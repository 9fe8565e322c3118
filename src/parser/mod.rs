//! Pure field normalization: raw scraped text into typed values.
//!
//! Nothing here does I/O and nothing here panics on malformed input; `None`
//! or a sentinel is the only failure signal.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder title for listings whose source markup carried none.
pub const TITLE_PLACEHOLDER: &str = "Title unavailable";

/// Sentinel year used when no 4-digit year token is present.
pub const FALLBACK_YEAR: i32 = 2024;

/// Odometer values at or below this are indistinguishable from a model year
/// and are rejected as implausible.
const KM_PLAUSIBILITY_FLOOR: u32 = 2030;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex is valid"));

/// Parses a price display string ("R$ 85.000,00", "USD 2000") into a plain
/// number. Comma is treated as the decimal separator, thousands periods are
/// dropped with everything else that is not a digit.
pub fn parse_price(raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        return None;
    }

    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();

    if clean.is_empty() {
        return None;
    }

    clean.replace(',', ".").parse::<f64>().ok()
}

/// Trims a raw title and collapses internal whitespace runs to single
/// spaces. Absent or all-whitespace input yields [`TITLE_PLACEHOLDER`].
/// Idempotent.
pub fn sanitize_title(raw: Option<&str>) -> String {
    match raw {
        Some(text) if !text.trim().is_empty() => {
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        _ => TITLE_PLACEHOLDER.to_string(),
    }
}

/// Finds the first 19xx/20xx token in an attributes blob. Returns
/// [`FALLBACK_YEAR`] when none is present.
pub fn extract_year(text: &str) -> i32 {
    YEAR_RE
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(FALLBACK_YEAR)
}

/// Finds the first 19xx/20xx token without falling back, for callers that
/// need to know whether a year was actually present.
pub fn find_year(text: &str) -> Option<&str> {
    YEAR_RE.find(text).map(|m| m.as_str())
}

/// Extracts an odometer reading in kilometers from an attributes blob.
///
/// Only attempted when the text carries a "km" marker; digits are stripped
/// out and parsed. Values that could be a bare model year ("2018") are
/// rejected, so text listing only a year never reads as distance. 0 means
/// unknown.
pub fn extract_km(text: &str) -> u32 {
    if !text.to_lowercase().contains("km") {
        return 0;
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<u32>() {
        Ok(val) if val > KM_PLAUSIBILITY_FLOOR => val,
        _ => 0,
    }
}
