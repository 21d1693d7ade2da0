// src/notify.rs

//! Outbound notification on permit approval.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::exam::credential::PermitNotification;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PermitNotification) -> Result<(), NotifyError>;
}

/// Posts a chat-style message to a webhook.
pub struct WebhookNotifier {
    client: Client,
    target_url: String,
}

impl WebhookNotifier {
    pub fn new(target_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, target_url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &PermitNotification) -> Result<(), NotifyError> {
        let body = json!({
            "text": event.message(),
            "permit": event,
        });

        let resp = self.client.post(&self.target_url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &PermitNotification) -> Result<(), NotifyError> {
        tracing::info!(
            permit_number = %event.permit_number,
            name = %event.name,
            "Permit approved (no webhook configured)"
        );
        Ok(())
    }
}

/// Owns the notifier and numbers every dispatch for log correlation.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    sequence: AtomicU64,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            sequence: AtomicU64::new(0),
        }
    }

    /// Webhook dispatcher when `target_url` is set, log-only otherwise.
    pub fn from_webhook(target_url: Option<String>) -> Self {
        match target_url {
            Some(url) => Self::new(Arc::new(WebhookNotifier::new(url))),
            None => Self::new(Arc::new(LogNotifier)),
        }
    }

    /// Number of notifications dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Spawns the notification and returns at once. The task is never joined;
    /// a failure only shows up in the logs.
    pub fn dispatch(&self, event: PermitNotification) -> u64 {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            match notifier.notify(&event).await {
                Ok(()) => tracing::info!(seq, permit_number = %event.permit_number, "Permit notification sent"),
                Err(e) => tracing::warn!(seq, permit_number = %event.permit_number, "Permit notification failed: {}", e),
            }
        });

        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<PermitNotification>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, event: &PermitNotification) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _event: &PermitNotification) -> Result<(), NotifyError> {
            Err(NotifyError::Status(500))
        }
    }

    fn event() -> PermitNotification {
        PermitNotification {
            name: "Somchai".into(),
            organization: "Siam Scaffolding".into(),
            score: 10,
            max_score: 10,
            permit_number: "P-1".into(),
        }
    }

    #[tokio::test]
    async fn dispatch_numbers_events_and_delivers() {
        let recording = Arc::new(Recording(Mutex::new(Vec::new())));
        let dispatcher = Dispatcher::new(recording.clone());

        assert_eq!(dispatcher.dispatch(event()), 1);
        assert_eq!(dispatcher.dispatch(event()), 2);
        assert_eq!(dispatcher.dispatched(), 2);

        for _ in 0..50 {
            if recording.0.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(recording.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_notifier_does_not_surface() {
        let dispatcher = Dispatcher::new(Arc::new(Failing));
        assert_eq!(dispatcher.dispatch(event()), 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
