//! HTTP gateway
//!
//! Each event becomes `POST {service_url}/{event}` with the payload as the
//! JSON body. A 2xx answer body is the response value (an empty body reads
//! as `null`); anything else is turned into `GatewayError::Status` with the
//! body text as the message.

use super::{Gateway, GatewayError, Service};
use crate::config::GatewayConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("noteva-migrate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn endpoint(&self, service: Service, event: &str) -> String {
        format!("{}/{}", self.config.service_url(service.as_str()), event)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send(&self, service: Service, event: &str, payload: Value) -> Result<Value, GatewayError> {
        let url = self.endpoint(service, event);
        let transport = |e: reqwest::Error| GatewayError::Transport {
            service,
            message: e.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                service,
                event: event.to_string(),
                code: status.as_u16(),
                message: error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|source| GatewayError::Decode {
            event: event.to_string(),
            source,
        })
    }
}

/// Pull a readable message out of an error body.
///
/// Services answer errors as `{"message": "..."}`; fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
