//! Shared HTTP plumbing for JSON property APIs.

use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::ProviderSettings;
use crate::errors::ProviderError;

/// A configured GET endpoint taking an `address` query parameter.
pub struct HttpEndpoint {
    client: Client,
    provider: String,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEndpoint {
    /// Build an endpoint whose every call is bounded by `settings.timeout`.
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout.min(Duration::from_secs(5)))
            .build()
            .with_context(|| format!("Failed to create HTTP client for {}", settings.name))?;

        Ok(Self {
            client,
            provider: settings.name.clone(),
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Fetch and decode the JSON body for `address`.
    pub async fn get_json(&self, address: &str) -> Result<Value, ProviderError> {
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("address", address)])
            .header(header::ACCEPT, "application/json");

        if let Some(ref key) = self.api_key {
            request = request.header("X-API-KEY", key);
        }

        debug!("{} request: {}", self.provider, self.base_url);

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if let Some(err) = classify_status(&self.provider, status) {
            let body = response.text().await.unwrap_or_default();
            debug!("{} returned HTTP {}: {}", self.provider, status, body);
            return Err(err);
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        serde_json::from_str(&text).map_err(|e| ProviderError::MalformedResponse {
            provider: self.provider.clone(),
            detail: e.to_string(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                provider: self.provider.clone(),
            }
        } else {
            ProviderError::NetworkFailure {
                provider: self.provider.clone(),
                detail: e.to_string(),
            }
        }
    }
}

/// Map a non-success HTTP status onto a provider error.
///
/// Returns `None` for 2xx.
pub fn classify_status(provider: &str, status: StatusCode) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }

    let provider = provider.to_string();
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthFailure { provider },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { provider },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Timeout { provider }
        }
        other if other.is_client_error() => ProviderError::ClientError {
            provider,
            status: other.as_u16(),
        },
        other => ProviderError::NetworkFailure {
            provider,
            detail: format!("HTTP {}", other),
        },
    })
}
