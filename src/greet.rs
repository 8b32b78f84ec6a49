//! `GET /greet?lat=<float>&lon=<float>`
//!
//! Validates the coordinate, geocodes it to a country, picks that country's
//! language and translates [`ORIGINAL_TEXT`] into it. Collaborator failures
//! degrade the answer but never the status: the only non-200 responses are
//! the two client-input errors.

use crate::geocoding::{resolve_country, GeoResult, Geocoder};
use crate::server::AppState;
use crate::translation::{translate_or_original, Translator};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

/// The phrase every greeting is translated from.
pub const ORIGINAL_TEXT: &str = "Hello";

/// Placeholder for country fields that could not be determined.
pub const UNKNOWN: &str = "Unknown";

pub const EXAMPLE_CALL: &str = "/greet?lat=34.0522&lon=-118.2437";

const UNKNOWN_COUNTRY_INFO: &str =
    "Could not determine country for the given coordinates, defaulting to English translation.";

/// Raw query parameters, kept as strings so bad input can be echoed back.
#[derive(Debug, Default)]
pub struct GreetParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl GreetParams {
    /// Build from decoded query pairs. A repeated key keeps its first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "lat" => &mut params.lat,
                "lon" => &mut params.lon,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GreetError {
    #[error("Missing latitude or longitude parameters.")]
    MissingParameter,

    #[error("Invalid latitude or longitude format. Must be numeric.")]
    InvalidParameterFormat { lat: String, lon: String },
}

impl IntoResponse for GreetError {
    fn into_response(self) -> Response {
        let body = match &self {
            GreetError::MissingParameter => json!({
                "error": self.to_string(),
                "example": EXAMPLE_CALL,
            }),
            GreetError::InvalidParameterFormat { lat, lon } => json!({
                "error": self.to_string(),
                "received_lat": lat,
                "received_lon": lon,
            }),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Body of every 200 from `/greet`.
///
/// `country` and `country_code` are `"Unknown"` when the country could not be
/// determined. A found country whose code the geocoder left out also reports
/// `country_code` as `"Unknown"` rather than an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub message: String,
    pub original_text: String,
    pub country: String,
    pub country_code: String,
    pub language_code: String,
    /// Only set on the degraded path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl GreetingResponse {
    fn new(geo: GeoResult, message: String) -> Self {
        let found = geo.is_found();
        let (country, country_code) = if found {
            (
                geo.country_name.unwrap_or_else(|| UNKNOWN.to_string()),
                geo.country_code.unwrap_or_else(|| UNKNOWN.to_string()),
            )
        } else {
            (UNKNOWN.to_string(), UNKNOWN.to_string())
        };

        Self {
            message,
            original_text: ORIGINAL_TEXT.to_string(),
            country,
            country_code,
            language_code: geo.language_code.to_string(),
            info: (!found).then(|| UNKNOWN_COUNTRY_INFO.to_string()),
        }
    }
}

/// Parse a decimal, allowing surrounding whitespace and `_` between digits
/// (`"1_000.5"`). Any other underscore is left in and fails the parse.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    let cleaned: String = trimmed
        .char_indices()
        .filter(|&(i, c)| {
            let digit_grouping = c == '_'
                && i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            !digit_grouping
        })
        .map(|(_, c)| c)
        .collect();
    cleaned.parse().ok()
}

/// Validate and parse `lat`/`lon`. Empty counts as missing; no range checks.
pub fn parse_coordinates(params: &GreetParams) -> Result<(f64, f64), GreetError> {
    let (lat, lon) = match (params.lat.as_deref(), params.lon.as_deref()) {
        (Some(lat), Some(lon)) if !lat.is_empty() && !lon.is_empty() => (lat, lon),
        _ => return Err(GreetError::MissingParameter),
    };

    match (parse_number(lat), parse_number(lon)) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(GreetError::InvalidParameterFormat {
            lat: lat.to_string(),
            lon: lon.to_string(),
        }),
    }
}

/// Geocode, then translate. The translation target depends on the geocoding
/// result, so the two calls always run in sequence.
pub async fn greeting_for(
    geocoder: &dyn Geocoder,
    translator: &dyn Translator,
    lat: f64,
    lon: f64,
) -> GreetingResponse {
    let geo = resolve_country(geocoder, lat, lon).await;
    let message = translate_or_original(translator, ORIGINAL_TEXT, geo.language_code).await;
    GreetingResponse::new(geo, message)
}

pub async fn greet(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<GreetingResponse>, GreetError> {
    let params = GreetParams::from_pairs(pairs);
    let (lat, lon) = parse_coordinates(&params).map_err(|e| {
        debug!("Rejected greet request {:?}: {}", params, e);
        e
    })?;

    let response =
        greeting_for(state.geocoder.as_ref(), state.translator.as_ref(), lat, lon).await;

    info!(
        "Greeting for {}, {}: {} ({}) -> '{}'",
        lat, lon, response.country, response.language_code, response.message
    );

    Ok(Json(response))
}
