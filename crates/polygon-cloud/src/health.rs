//! Node application health endpoint

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application whose status endpoint is probed
pub const DEFAULT_APP: &str = "boyar";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Payload served by `/services/<app>/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPayload {
    #[serde(rename = "Status", default)]
    pub status: String,

    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "Error", default)]
    pub error: Option<String>,

    /// Everything else the endpoint reports, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HealthPayload {
    /// Time elapsed since the node last refreshed its status
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.timestamp)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Fetches a node's health payload
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn fetch_status(&self, host: &str) -> Result<HealthPayload>;
}

/// Plain-HTTP probe of `http://<host>/services/<app>/status`
pub struct HttpHealthProbe {
    client: reqwest::Client,
    app: String,
    port: Option<u16>,
}

impl HttpHealthProbe {
    pub fn new(app: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            app: app.into(),
            port: None,
        }
    }

    /// Probe a non-default port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn status_url(&self, host: &str) -> String {
        match self.port {
            Some(port) => format!("http://{}:{}/services/{}/status", host, port, self.app),
            None => format!("http://{}/services/{}/status", host, self.app),
        }
    }
}

impl Default for HttpHealthProbe {
    fn default() -> Self {
        Self::new(DEFAULT_APP)
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn fetch_status(&self, host: &str) -> Result<HealthPayload> {
        let url = self.status_url(host);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(CloudError::ApiError(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let payload: HealthPayload = response.json().await?;
        Ok(payload)
    }
}
