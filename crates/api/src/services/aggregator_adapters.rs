//! HTTP adapters for the state EVV aggregators (HHAeXchange, Sandata,
//! Tellus), each a thin REST client against its submission endpoint
//! (spec.md §4.5, §6).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use domain::models::submission::AdapterResult;
use domain::ports::aggregator_adapter::AggregatorAdapter;

use crate::config::AggregatorEndpointConfig;

/// Generic response envelope every aggregator is expected to return; the
/// exact field names vary by state contract but all three agencies settle
/// on this shape in practice.
#[derive(Debug, Deserialize)]
struct AggregatorResponse {
    #[serde(default)]
    accepted: bool,
    #[serde(default)]
    confirmation_id: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// REST adapter shared by all three aggregators; only the base URL, header
/// name, and display name differ between them.
pub struct HttpAggregatorAdapter {
    client: Client,
    config: AggregatorEndpointConfig,
    display_name: &'static str,
}

impl HttpAggregatorAdapter {
    pub fn new(display_name: &'static str, config: AggregatorEndpointConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            display_name,
        }
    }

    pub fn hhaexchange(config: AggregatorEndpointConfig) -> Self {
        Self::new("HHAeXchange", config)
    }

    pub fn sandata(config: AggregatorEndpointConfig) -> Self {
        Self::new("Sandata", config)
    }

    pub fn tellus(config: AggregatorEndpointConfig) -> Self {
        Self::new("Tellus", config)
    }
}

#[async_trait]
impl AggregatorAdapter for HttpAggregatorAdapter {
    async fn submit(&self, record: &serde_json::Value) -> AdapterResult {
        if !self.config.enabled || self.config.url.is_empty() {
            return AdapterResult {
                success: false,
                confirmation_id: None,
                error_code: Some("AGGREGATOR_DISABLED".into()),
                error_message: Some(format!("{} submission is not configured", self.display_name)),
                requires_retry: true,
                retry_after_seconds: None,
            };
        }

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(record)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(aggregator = self.display_name, error = %e, "aggregator submission transport failure");
                return AdapterResult {
                    success: false,
                    confirmation_id: None,
                    error_code: Some("NETWORK_ERROR".into()),
                    error_message: Some(e.to_string()),
                    requires_retry: true,
                    retry_after_seconds: None,
                };
            }
        };

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok());
            return AdapterResult {
                success: false,
                confirmation_id: None,
                error_code: Some("RATE_LIMITED".into()),
                error_message: Some("aggregator rate limit exceeded".into()),
                requires_retry: true,
                retry_after_seconds: retry_after,
            };
        }
        if status.is_server_error() {
            return AdapterResult {
                success: false,
                confirmation_id: None,
                error_code: Some(format!("HTTP_{}", status.as_u16())),
                error_message: Some("aggregator server error".into()),
                requires_retry: true,
                retry_after_seconds: None,
            };
        }

        let body = match response.json::<AggregatorResponse>().await {
            Ok(body) => body,
            Err(e) => {
                return AdapterResult {
                    success: false,
                    confirmation_id: None,
                    error_code: Some("INVALID_RESPONSE".into()),
                    error_message: Some(e.to_string()),
                    requires_retry: true,
                    retry_after_seconds: None,
                };
            }
        };

        if !status.is_success() || !body.accepted {
            debug!(
                aggregator = self.display_name,
                error_code = ?body.error_code,
                "aggregator rejected submission"
            );
            return AdapterResult {
                success: false,
                confirmation_id: None,
                error_code: body.error_code,
                error_message: body.error_message,
                requires_retry: false,
                retry_after_seconds: None,
            };
        }

        AdapterResult {
            success: true,
            confirmation_id: body.confirmation_id,
            error_code: None,
            error_message: None,
            requires_retry: false,
            retry_after_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_aggregator_requires_retry() {
        let adapter = HttpAggregatorAdapter::hhaexchange(AggregatorEndpointConfig {
            url: String::new(),
            api_key: String::new(),
            timeout_ms: 1000,
            enabled: false,
        });
        let result = adapter.submit(&serde_json::json!({})).await;
        assert!(!result.success);
        assert!(result.requires_retry);
        assert_eq!(result.error_code.as_deref(), Some("AGGREGATOR_DISABLED"));
    }
}
