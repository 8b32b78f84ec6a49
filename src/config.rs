use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Which translation backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationProvider {
    Google,
    LibreTranslate,
}

impl TranslationProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "libretranslate" | "libre" => Ok(Self::LibreTranslate),
            other => bail!(
                "Unknown TRANSLATION_PROVIDER '{}'. Expected 'google' or 'libretranslate'",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Geocoding (Nominatim)
    pub nominatim_url: String,
    pub nominatim_user_agent: String,
    pub geocoding_timeout: Duration,

    // Translation
    pub translation_provider: TranslationProvider,
    pub google_translate_url: String,
    pub libretranslate_url: String,
    pub libretranslate_api_key: Option<String>,
    pub translation_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Server
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 5000)?,

            // Geocoding
            nominatim_url: std::env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            nominatim_user_agent: std::env::var("NOMINATIM_USER_AGENT")
                .unwrap_or_else(|_| "geo-greeter".to_string()),
            geocoding_timeout: Duration::from_secs(parse_var("GEOCODING_TIMEOUT_SECS", 5)?),

            // Translation
            translation_provider: match std::env::var("TRANSLATION_PROVIDER") {
                Ok(value) => TranslationProvider::parse(&value)?,
                Err(_) => TranslationProvider::Google,
            },
            google_translate_url: std::env::var("GOOGLE_TRANSLATE_URL")
                .unwrap_or_else(|_| "https://translate.googleapis.com".to_string()),
            libretranslate_url: std::env::var("LIBRETRANSLATE_URL")
                .unwrap_or_else(|_| "https://translate.astian.org".to_string()),
            libretranslate_api_key: std::env::var("LIBRETRANSLATE_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            translation_timeout: Duration::from_secs(parse_var("TRANSLATION_TIMEOUT_SECS", 10)?),
        })
    }

    /// Socket address string the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a numeric variable, falling back to `default` when unset.
/// A set but unparseable value is an error rather than a silent default.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, value)),
        Err(_) => Ok(default),
    }
}
