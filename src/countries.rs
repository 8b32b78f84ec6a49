//! Country to language table: picks the language a coordinate is greeted in.
//!
//! The table is fixed at compile time. A `HashMap` index over it is built
//! once on first lookup (`OnceLock`) and shared read-only by every request.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Language used whenever a country is unknown or not in the table.
pub const DEFAULT_LANGUAGE: &str = "en";

/// One row of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryLanguage {
    /// ISO 3166-1 alpha-2 country code, upper-case (e.g. "FR")
    pub country_code: &'static str,

    /// Primary spoken language code (e.g. "fr")
    pub language_code: &'static str,
}

const fn entry(country_code: &'static str, language_code: &'static str) -> CountryLanguage {
    CountryLanguage {
        country_code,
        language_code,
    }
}

/// Not exhaustive. Multilingual countries map to a single language.
static COUNTRY_LANGUAGES: &[CountryLanguage] = &[
    entry("US", "en"),
    entry("GB", "en"),
    entry("CA", "en"), // also fr
    entry("AU", "en"),
    entry("DE", "de"),
    entry("FR", "fr"),
    entry("ES", "es"),
    entry("IT", "it"),
    entry("JP", "ja"),
    entry("CN", "zh"),
    entry("RU", "ru"),
    entry("BR", "pt"),
    entry("PT", "pt"),
    entry("MX", "es"),
    entry("AR", "es"),
    entry("IN", "hi"),
    entry("KR", "ko"),
    entry("NL", "nl"),
    entry("SE", "sv"),
    entry("NO", "no"),
    entry("DK", "da"),
    entry("FI", "fi"),
    entry("GR", "el"),
    entry("TR", "tr"),
    entry("EG", "ar"),
    entry("SA", "ar"),
    entry("TH", "th"),
    entry("VN", "vi"),
    entry("ID", "id"),
    entry("PH", "tl"),
    entry("ZA", "en"),
    entry("KE", "sw"),
    entry("NG", "en"),
];

static INDEX: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn index() -> &'static HashMap<&'static str, &'static str> {
    INDEX.get_or_init(|| {
        COUNTRY_LANGUAGES
            .iter()
            .map(|e| (e.country_code, e.language_code))
            .collect()
    })
}

/// All rows of the table, in definition order.
pub fn entries() -> &'static [CountryLanguage] {
    COUNTRY_LANGUAGES
}

/// Look up the language for a country code.
///
/// Matching is case-insensitive. Empty or unknown codes resolve to
/// [`DEFAULT_LANGUAGE`], so the lookup never fails.
pub fn language_for_country(country_code: &str) -> &'static str {
    let code = country_code.trim().to_ascii_uppercase();
    index()
        .get(code.as_str())
        .copied()
        .unwrap_or(DEFAULT_LANGUAGE)
}
