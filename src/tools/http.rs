//! Shared HTTP access for tool backends.

use super::ToolError;
use crate::config::ToolSettings;
use crate::error::{AbacusError, Result, UpstreamFailure};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A `reqwest` client configured for tool calls.
#[derive(Clone)]
pub struct ToolHttp {
    client: reqwest::Client,
    timeout: Duration,
}

impl ToolHttp {
    pub fn new(settings: &ToolSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| AbacusError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: settings.timeout(),
        })
    }

    /// Build `base?params`, reporting a bad configured endpoint as an upstream failure.
    pub fn url(service: &str, base: &str, params: &[(&str, &str)]) -> std::result::Result<Url, ToolError> {
        Url::parse_with_params(base, params).map_err(|e| {
            ToolError::Upstream(UpstreamFailure::Transport {
                service: service.to_string(),
                message: format!("invalid endpoint '{}': {}", base, e),
            })
        })
    }

    /// GET a URL and return the body as text.
    pub async fn get_text(&self, service: &str, url: Url) -> std::result::Result<String, ToolError> {
        debug!("{} GET {}", service, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamFailure::from_reqwest(service, &e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamFailure::Status {
                service: service.to_string(),
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            }
            .into());
        }

        response
            .text()
            .await
            .map_err(|e| UpstreamFailure::from_reqwest(service, &e, self.timeout).into())
    }

    /// GET a URL and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: Url,
    ) -> std::result::Result<T, ToolError> {
        let body = self.get_text(service, url).await?;
        serde_json::from_str(&body).map_err(|e| {
            ToolError::Upstream(UpstreamFailure::Transport {
                service: service.to_string(),
                message: format!("unexpected response: {}", e),
            })
        })
    }
}
