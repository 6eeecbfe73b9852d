//! Webhook delivery over HTTP.

use super::{DeliveryReport, Notifier};
use crate::error::{RejoinError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct Payload<'a> {
    content: &'a str,
}

/// Posts `{"content": text}` to each configured webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl WebhookNotifier {
    /// Create a notifier for the given endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RejoinError::config(format!("HTTP client: {e}")))?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn deliver(&self, endpoint: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(endpoint)
            .json(&Payload { content: text })
            .send()
            .await
            .map_err(|e| RejoinError::notification(redact(endpoint), e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RejoinError::notification(
                redact(endpoint),
                format!("HTTP {status}"),
            ))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, text: &str) -> DeliveryReport {
        let results = join_all(self.endpoints.iter().map(|e| self.deliver(e, text))).await;

        let mut report = DeliveryReport::default();
        for (endpoint, result) in self.endpoints.iter().zip(results) {
            match result {
                Ok(()) => {
                    debug!("Notified {}", redact(endpoint));
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failed.push((redact(endpoint), e.to_string()));
                }
            }
        }
        report
    }
}

/// Strip the secret token from a webhook URL for logging.
pub fn redact(endpoint: &str) -> String {
    let without_scheme = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    match without_scheme.rsplit_once('/') {
        Some((head, tail)) if !tail.is_empty() && head.contains('/') => format!("{head}/***"),
        _ => without_scheme.to_string(),
    }
}
