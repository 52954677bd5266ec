use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    Config, FetchError, WeatherRecord,
    config::{API_KEY_ENV, DEFAULT_TIMEOUT},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1/current.json";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Longest wait for a complete response; applied to every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a provider from stored config; the `WEATHERAPI_KEY` variable wins over the file.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.resolve_api_key(std::env::var(API_KEY_ENV).ok())?;

        let mut provider = Self::new(api_key).with_timeout(config.timeout());
        if let Some(base_url) = &config.base_url {
            provider = provider.with_base_url(base_url.clone());
        }

        Ok(provider)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch(&self, query: &str) -> Result<WeatherRecord, FetchError> {
        debug!(query, url = %self.base_url, "requesting current weather");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("q", query)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport("Failed to send request to WeatherAPI.com", &e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| transport("Failed to read WeatherAPI response body", &e))?;

        if !status.is_success() {
            warn!(query, %status, "WeatherAPI request rejected");
            return Err(FetchError::Transport(format!(
                "WeatherAPI request failed with status {}: {}",
                status,
                error_message(&body),
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| FetchError::Parse(format!("Failed to parse WeatherAPI JSON: {e}")))
    }
}

/// weatherapi.com reports failures as `{"error": {"code": 1006, "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct WaErrorBody {
    error: WaError,
}

#[derive(Debug, Deserialize)]
struct WaError {
    message: String,
}

fn transport(what: &str, err: &reqwest::Error) -> FetchError {
    let reason = if err.is_timeout() { "request timed out".to_string() } else { err.to_string() };
    FetchError::Transport(format!("{what}: {reason}"))
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<WaErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
