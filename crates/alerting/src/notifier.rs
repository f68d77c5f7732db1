//! Notification Forwarder
//!
//! Drains the dispatcher queue and POSTs each notification to the external
//! channel. Delivery is fire-and-forget with a short client timeout; failures
//! are logged and the notification discarded.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Endpoint the `{owner_id, text}` payload is POSTed to
    pub endpoint: String,
    /// Per-request timeout in milliseconds (default: 2000)
    pub timeout_ms: u64,
    /// Capacity of the dispatcher-to-forwarder queue (default: 256)
    pub queue_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9090/notify".to_string(),
            timeout_ms: 2000,
            queue_capacity: 256,
        }
    }
}

/// Text message addressed to one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub owner_id: i64,
    pub text: String,
}

/// Queue-draining HTTP forwarder.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    /// Build the forwarder; the timeout is enforced at the client level so a
    /// stalled channel can never hold up the queue for longer than one
    /// request.
    pub fn new(config: &NotifierConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Forward notifications until the queue closes.
    pub async fn run(self, mut inbox: mpsc::Receiver<Notification>) {
        info!("notification forwarder started for {}", self.endpoint);

        while let Some(notification) = inbox.recv().await {
            match self.send(&notification).await {
                Ok(()) => {
                    debug!("notification delivered to owner {}", notification.owner_id);
                    counter!("notifications_delivered_total").increment(1);
                }
                Err(e) => {
                    // Best-effort: logged, discarded, never retried.
                    warn!(
                        "delivery failed for owner {}: {}",
                        notification.owner_id, e
                    );
                    counter!("notifications_failed_total").increment(1);
                }
            }
        }

        info!("notification forwarder stopped");
    }

    async fn send(&self, notification: &Notification) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_stops_when_queue_closes() {
        let notifier = HttpNotifier::new(&NotifierConfig::default()).unwrap();
        let (tx, rx) = mpsc::channel::<Notification>(1);
        drop(tx);

        // No senders left: the loop exits without touching the network.
        notifier.run(rx).await;
    }
}
