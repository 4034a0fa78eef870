use crate::{
    Config,
    backend::http::HttpBackend,
    config::BACKEND_URL_ENV,
    model::{RawSuggestion, Suggestion, WeatherPayload},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod http;

/// The two calls the client makes against the Nimbus backend.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// `GET /api/location-suggestions?query=<text>`
    async fn location_suggestions(&self, query: &str) -> anyhow::Result<Vec<RawSuggestion>>;

    /// `GET /api/weather?lat=..&lon=..&city=..&country=..`
    async fn weather(&self, location: &Suggestion) -> anyhow::Result<WeatherPayload>;
}

/// Construct the HTTP backend from config, resolving the base URL.
pub fn backend_from_config(config: &Config) -> anyhow::Result<Arc<dyn Backend>> {
    build_backend(config, std::env::var(BACKEND_URL_ENV).ok())
}

fn build_backend(config: &Config, env_override: Option<String>) -> anyhow::Result<Arc<dyn Backend>> {
    let base_url = config.backend_url_with_override(env_override)?;
    let settings = config.settings();

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(base_url, settings.request_timeout)?);
    Ok(backend)
}
