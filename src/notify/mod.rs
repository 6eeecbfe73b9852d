//! Operator notifications.
//!
//! Notifications are best-effort: a [`Notifier`] never returns an error.
//! Delivery problems are logged and reported in the [`DeliveryReport`] so
//! callers that care (the `notify-test` command) can show them.

pub mod messages;
pub mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;

/// Per-call delivery summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Endpoints that accepted the message
    pub delivered: usize,
    /// Endpoints that failed, with the reason (endpoint redacted)
    pub failed: Vec<(String, String)>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends a short text message to every configured endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`. Never fails; see [`DeliveryReport`].
    async fn notify(&self, text: &str) -> DeliveryReport;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    async fn notify(&self, text: &str) -> DeliveryReport {
        (**self).notify(text).await
    }
}
