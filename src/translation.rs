use crate::config::{Config, TranslationProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Source language passed to every backend; the service detects it.
pub const AUTO_DETECT: &str = "auto";

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("failed to reach translation service: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed translation response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;
}

/// Translate `text` into `target`, returning `text` unchanged on any failure.
pub async fn translate_or_original(translator: &dyn Translator, text: &str, target: &str) -> String {
    match translator.translate(text, AUTO_DETECT, target).await {
        Ok(translated) => {
            debug!("Translated '{}' to {}: '{}'", text, target, translated);
            translated
        }
        Err(e) => {
            warn!("Translation error ({} -> {}): {}", text, target, e);
            text.to_string()
        }
    }
}

/// Build the backend selected by `TRANSLATION_PROVIDER`.
pub fn build_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    let translator: Arc<dyn Translator> = match config.translation_provider {
        TranslationProvider::Google => Arc::new(GoogleTranslator::new(
            &config.google_translate_url,
            config.translation_timeout,
        )?),
        TranslationProvider::LibreTranslate => Arc::new(LibreTranslator::new(
            &config.libretranslate_url,
            config.libretranslate_api_key.clone(),
            config.translation_timeout,
        )?),
    };
    Ok(translator)
}

fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create translation HTTP client")
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TranslationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(TranslationError::Status { status, body })
}

// ==================== Google ====================

/// Google's public `translate_a/single` endpoint (no API key).
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Concatenate the `[0][*][0]` segments of a `translate_a/single` reply.
fn parse_google_response(json: &serde_json::Value) -> Result<String, TranslationError> {
    let segments = json
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslationError::Malformed("missing segment array".to_string()))?;

    let translation: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|v| v.as_str()))
        .collect();

    if translation.is_empty() {
        return Err(TranslationError::Malformed("empty translation".to_string()));
    }

    Ok(translation)
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/translate_a/single", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TranslationError::Malformed(format!("{}: {}", e, body)))?;

        parse_google_response(&json)
    }
}

// ==================== LibreTranslate ====================

#[derive(Debug, Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// A LibreTranslate instance (`POST /translate`).
#[derive(Debug, Clone)]
pub struct LibreTranslator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LibreTranslator {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Translator for LibreTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/translate", self.base_url);

        let request = LibreRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let response = ensure_success(response).await?;

        let parsed: LibreResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Malformed(e.to_string()))?;

        if parsed.translated_text.is_empty() {
            return Err(TranslationError::Malformed("empty translation".to_string()));
        }

        Ok(parsed.translated_text)
    }
}
