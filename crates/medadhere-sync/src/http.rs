// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP sync target.
//!
//! Each action is POSTed as JSON to the configured endpoint with its id in
//! the `Idempotency-Key` header, so the remote side can drop re-deliveries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use medadhere_config::model::SyncConfig;
use medadhere_core::{
    Action, AdapterType, HealthStatus, MedAdhereError, PluginAdapter, SyncTarget,
};

/// Header carrying the action id on every delivery.
pub const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Longest response body excerpt kept in a delivery error.
const MAX_ERROR_BODY: usize = 200;

/// Sync target that POSTs one action per request.
#[derive(Debug, Clone)]
pub struct HttpSyncTarget {
    client: reqwest::Client,
    endpoint_url: String,
}

impl HttpSyncTarget {
    /// Build a client for `config.endpoint_url` with the configured request timeout.
    pub fn new(config: &SyncConfig) -> Result<Self, MedAdhereError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MedAdhereError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    /// The endpoint actions are delivered to.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Returns true if the endpoint answered at all within `timeout`.
    ///
    /// Any HTTP status counts as reachable; only transport failures and
    /// timeouts mean offline.
    pub async fn probe(&self, timeout: Duration) -> bool {
        match self
            .client
            .head(&self.endpoint_url)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!(status = %response.status(), "sync endpoint reachable");
                true
            }
            Err(e) => {
                debug!(error = %e, "sync endpoint unreachable");
                false
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpSyncTarget {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SyncTarget
    }

    async fn health_check(&self) -> Result<HealthStatus, MedAdhereError> {
        if self.probe(Duration::from_secs(5)).await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!(
                "sync endpoint {} is unreachable",
                self.endpoint_url
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), MedAdhereError> {
        Ok(())
    }
}

#[async_trait]
impl SyncTarget for HttpSyncTarget {
    async fn deliver(&self, action: &Action) -> Result<(), MedAdhereError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .header(IDEMPOTENCY_KEY, action.id.to_string())
            .json(action)
            .send()
            .await
            .map_err(|e| MedAdhereError::Delivery {
                message: format!("request to sync endpoint failed: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(id = %action.id, kind = %action.kind, status = %status, "action delivered");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
        Err(MedAdhereError::Delivery {
            message: format!("sync endpoint returned {status}: {excerpt}"),
            status: Some(status.as_u16()),
            source: None,
        })
    }
}
