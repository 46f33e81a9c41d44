//! Market and language catalog
//!
//! The metrics provider addresses markets by numeric geo codes and
//! languages by short codes it maps to its own constants. This catalog
//! drives the config endpoints and language resolution.

use serde::Serialize;

/// Default market when none is given: Switzerland.
pub const DEFAULT_COUNTRY: &str = "2756";

/// Fallback language when neither request nor market resolves one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// One supported market
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryInfo {
    /// Provider geo code (numeric string)
    pub code: &'static str,
    pub name: &'static str,
    pub default_language: &'static str,
    pub currency: &'static str,
}

/// One supported language with the provider's language constant
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub code: &'static str,
    pub provider_id: &'static str,
}

/// Supported markets with their provider geo codes.
pub const COUNTRIES: &[CountryInfo] = &[
    CountryInfo { code: "2756", name: "Switzerland", default_language: "de", currency: "CHF" },
    CountryInfo { code: "2276", name: "Germany", default_language: "de", currency: "EUR" },
    CountryInfo { code: "2040", name: "Austria", default_language: "de", currency: "EUR" },
    CountryInfo { code: "2250", name: "France", default_language: "fr", currency: "EUR" },
    CountryInfo { code: "2380", name: "Italy", default_language: "it", currency: "EUR" },
    CountryInfo { code: "2724", name: "Spain", default_language: "es", currency: "EUR" },
    CountryInfo { code: "2528", name: "Netherlands", default_language: "nl", currency: "EUR" },
    CountryInfo { code: "2056", name: "Belgium", default_language: "nl", currency: "EUR" },
    CountryInfo { code: "2826", name: "United Kingdom", default_language: "en", currency: "GBP" },
    CountryInfo { code: "2840", name: "United States", default_language: "en", currency: "USD" },
    CountryInfo { code: "2124", name: "Canada", default_language: "en", currency: "CAD" },
    CountryInfo { code: "2036", name: "Australia", default_language: "en", currency: "AUD" },
    CountryInfo { code: "2616", name: "Poland", default_language: "pl", currency: "PLN" },
    CountryInfo { code: "2620", name: "Portugal", default_language: "pt", currency: "EUR" },
    CountryInfo { code: "2392", name: "Japan", default_language: "ja", currency: "JPY" },
];

/// Languages the provider understands, with its internal constants.
pub const LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo { code: "de", provider_id: "1001" },
    LanguageInfo { code: "en", provider_id: "1000" },
    LanguageInfo { code: "fr", provider_id: "1002" },
    LanguageInfo { code: "es", provider_id: "1003" },
    LanguageInfo { code: "it", provider_id: "1004" },
    LanguageInfo { code: "ja", provider_id: "1005" },
    LanguageInfo { code: "nl", provider_id: "1010" },
    LanguageInfo { code: "pt", provider_id: "1014" },
    LanguageInfo { code: "pl", provider_id: "1025" },
    LanguageInfo { code: "ru", provider_id: "1031" },
    LanguageInfo { code: "zh", provider_id: "1017" },
];

/// Default language for a market, when the market is known.
pub fn default_language_for(country_code: &str) -> Option<&'static str> {
    COUNTRIES
        .iter()
        .find(|c| c.code == country_code)
        .map(|c| c.default_language)
}

/// Resolve the job language: an explicit code wins (lower-cased), then the
/// market default, then English.
pub fn resolve_language(requested: Option<&str>, country_code: &str) -> String {
    if let Some(code) = requested {
        let code = code.trim().to_lowercase();
        if !code.is_empty() {
            return code;
        }
    }
    default_language_for(country_code)
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}
