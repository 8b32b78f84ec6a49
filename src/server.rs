use crate::config::Config;
use crate::countries;
use crate::geocoding::{Geocoder, NominatimClient};
use crate::greet::greet;
use crate::translation::{build_translator, Translator};
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state for request handlers. Only collaborator handles; nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<dyn Geocoder>,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    pub fn new(geocoder: Arc<dyn Geocoder>, translator: Arc<dyn Translator>) -> Self {
        Self {
            geocoder,
            translator,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let geocoder = Arc::new(NominatimClient::from_config(config)?);
        let translator = build_translator(config)?;
        Ok(Self::new(geocoder, translator))
    }
}

async fn health() -> &'static str {
    "OK"
}

pub fn build_router(state: AppState) -> Router {
    // Any origin may call the API
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/greet", get(greet))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = build_router(state);

    info!(
        "Geocoding via {} (timeout {:?}), translating via {:?} (timeout {:?})",
        config.nominatim_url,
        config.geocoding_timeout,
        config.translation_provider,
        config.translation_timeout
    );
    info!(
        "Loaded {} country/language mappings",
        countries::entries().len()
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("✓ Listening on http://{}/greet?lat=<latitude>&lon=<longitude>", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, never resolve and keep serving.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
