//! Reverse geocoding: coordinates to country.
//!
//! The HTTP client talks to a Nominatim instance. Callers should go through
//! [`resolve_country`], which never fails: every geocoding error folds into
//! an unknown country with the default language.

use crate::config::Config;
use crate::countries::{language_for_country, DEFAULT_LANGUAGE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Structured address fields of a reverse-geocoding match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub country: Option<String>,

    /// ISO 3166-1 alpha-2, as returned by the service (usually lower-case)
    #[serde(default)]
    pub country_code: Option<String>,
}

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("geocoding service timed out")]
    TimedOut,

    #[error("geocoding service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("unexpected geocoding failure: {0}")]
    Other(String),
}

impl From<reqwest::Error> for GeocodingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GeocodingError::TimedOut
        } else {
            GeocodingError::Other(e.to_string())
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best single match for the coordinate, in English.
    ///
    /// `Ok(None)` means the service answered but found nothing.
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<Address>, GeocodingError>;
}

/// Outcome of the geocoding step for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoResult {
    pub country_name: Option<String>,
    /// Upper-cased country code
    pub country_code: Option<String>,
    pub language_code: &'static str,
}

impl GeoResult {
    pub fn unknown() -> Self {
        Self {
            country_name: None,
            country_code: None,
            language_code: DEFAULT_LANGUAGE,
        }
    }

    fn from_address(address: Address) -> Self {
        let country_name = address.country.filter(|c| !c.trim().is_empty());
        let country_code = address
            .country_code
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty());
        let language_code = country_code
            .as_deref()
            .map(language_for_country)
            .unwrap_or(DEFAULT_LANGUAGE);

        Self {
            country_name,
            country_code,
            language_code,
        }
    }

    /// A country counts as found only when its name is known.
    pub fn is_found(&self) -> bool {
        self.country_name.is_some()
    }
}

/// Geocode a coordinate, absorbing every failure into [`GeoResult::unknown`].
pub async fn resolve_country(geocoder: &dyn Geocoder, lat: f64, lon: f64) -> GeoResult {
    match geocoder.reverse(lat, lon).await {
        Ok(Some(address)) => GeoResult::from_address(address),
        Ok(None) => {
            debug!("No geocoding match for {}, {}", lat, lon);
            GeoResult::unknown()
        }
        Err(GeocodingError::TimedOut) => {
            warn!("Geocoding service timed out for {}, {}", lat, lon);
            GeoResult::unknown()
        }
        Err(e @ GeocodingError::Service { .. }) => {
            error!("{} for {}, {}", e, lat, lon);
            GeoResult::unknown()
        }
        Err(e) => {
            error!("An unexpected error occurred during geocoding: {}", e);
            GeoResult::unknown()
        }
    }
}

// ==================== Nominatim ====================

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    /// Present (and `address` absent) when nothing matched
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    address: Option<Address>,
}

/// Client for the Nominatim `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to create geocoding HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.nominatim_url,
            &config.nominatim_user_agent,
            config.geocoding_timeout,
        )
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<Address>, GeocodingError> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                // Country level is all we need
                ("zoom", "3".to_string()),
                ("addressdetails", "1".to_string()),
                ("accept-language", "en".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodingError::Service {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: ReverseResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeocodingError::TimedOut
            } else {
                GeocodingError::Other(format!("Failed to parse geocoding response: {}", e))
            }
        })?;

        if let Some(err) = parsed.error {
            debug!("Nominatim returned no match: {}", err);
            return Ok(None);
        }

        Ok(parsed.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    // ==================== Helper Functions ====================

    fn create_client(base_url: &str) -> NominatimClient {
        NominatimClient::new(base_url, "geo-greeter-test", Duration::from_secs(2))
            .expect("client should build")
    }

    enum StaticGeocoder {
        Match(Option<Address>),
        TimedOut,
        ServiceError,
    }

    #[async_trait]
    impl Geocoder for StaticGeocoder {
        async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<Address>, GeocodingError> {
            match self {
                StaticGeocoder::Match(address) => Ok(address.clone()),
                StaticGeocoder::TimedOut => Err(GeocodingError::TimedOut),
                StaticGeocoder::ServiceError => Err(GeocodingError::Service {
                    status: 503,
                    message: "busy".to_string(),
                }),
            }
        }
    }

    fn address(country: Option<&str>, code: Option<&str>) -> Address {
        Address {
            country: country.map(String::from),
            country_code: code.map(String::from),
        }
    }

    // ==================== GeoResult Tests ====================

    #[test]
    fn test_from_address_uppercases_code_and_maps_language() {
        let result = GeoResult::from_address(address(Some("France"), Some("fr")));
        assert_eq!(result.country_name.as_deref(), Some("France"));
        assert_eq!(result.country_code.as_deref(), Some("FR"));
        assert_eq!(result.language_code, "fr");
        assert!(result.is_found());
    }

    #[test]
    fn test_from_address_unmapped_country_defaults_to_english() {
        let result = GeoResult::from_address(address(Some("Poland"), Some("pl")));
        assert_eq!(result.country_code.as_deref(), Some("PL"));
        assert_eq!(result.language_code, "en");
    }

    #[test]
    fn test_from_address_missing_country_is_not_found() {
        let result = GeoResult::from_address(address(None, Some("de")));
        assert!(!result.is_found());
        assert_eq!(result.language_code, "de");

        let empty = GeoResult::from_address(address(Some(""), None));
        assert!(!empty.is_found());
        assert_eq!(empty.language_code, "en");
    }

    // ==================== resolve_country Tests ====================

    #[tokio::test]
    async fn test_resolve_country_timeout_falls_back() {
        let geocoder = StaticGeocoder::TimedOut;
        assert_eq!(resolve_country(&geocoder, 1.0, 2.0).await, GeoResult::unknown());
    }

    #[tokio::test]
    async fn test_resolve_country_service_error_falls_back() {
        let geocoder = StaticGeocoder::ServiceError;
        let result = resolve_country(&geocoder, 1.0, 2.0).await;
        assert!(!result.is_found());
        assert_eq!(result.language_code, "en");
    }

    #[tokio::test]
    async fn test_resolve_country_no_match_falls_back() {
        let geocoder = StaticGeocoder::Match(None);
        assert_eq!(resolve_country(&geocoder, 0.0, 0.0).await, GeoResult::unknown());
    }

    // ==================== NominatimClient Tests ====================

    #[tokio::test]
    async fn test_reverse_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "48.8566"))
            .and(query_param("lon", "2.3522"))
            .and(query_param("accept-language", "en"))
            .and(header("User-Agent", "geo-greeter-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "place_id": 1,
                "display_name": "Paris, France",
                "address": {"city": "Paris", "country": "France", "country_code": "fr"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server.uri());
        let result = client.reverse(48.8566, 2.3522).await.unwrap();
        assert_eq!(result, Some(address(Some("France"), Some("fr"))));
    }

    #[tokio::test]
    async fn test_reverse_unable_to_geocode_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "Unable to geocode"})),
            )
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server.uri());
        assert_eq!(client.reverse(0.0, -150.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reverse_missing_address_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"place_id": 7})),
            )
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server.uri());
        assert_eq!(client.reverse(10.0, 10.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reverse_bad_request_is_service_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid coordinates"))
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server.uri());
        match client.reverse(999.0, 999.0).await {
            Err(GeocodingError::Service { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("Invalid coordinates"));
            }
            other => panic!("Expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reverse_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"address": {"country": "France"}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client =
            NominatimClient::new(&mock_server.uri(), "test", Duration::from_millis(50)).unwrap();
        assert!(matches!(
            client.reverse(1.0, 1.0).await,
            Err(GeocodingError::TimedOut)
        ));
    }

    #[tokio::test]
    async fn test_reverse_garbage_body_is_other_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server.uri());
        assert!(matches!(
            client.reverse(1.0, 1.0).await,
            Err(GeocodingError::Other(_))
        ));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = create_client("http://localhost:1234/");
        assert_eq!(client.base_url, "http://localhost:1234");
    }
}
