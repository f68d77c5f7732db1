//! Alert Dispatcher

use crate::{Alert, Notification};
use metrics::counter;
use tokio::sync::mpsc;
use tracing::warn;

/// Shared sink both detectors call into.
///
/// Formats the alert and hands it to the notification forwarder over a
/// bounded queue. Dispatch never blocks and never fails the caller: a full or
/// closed queue drops the notification with a log line.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    outbox: mpsc::Sender<Notification>,
}

impl AlertDispatcher {
    /// Create a dispatcher writing into the forwarder queue.
    pub fn new(outbox: mpsc::Sender<Notification>) -> Self {
        Self { outbox }
    }

    /// Format and forward one alert, best-effort.
    pub fn dispatch(&self, alert: &Alert) {
        let notification = Notification {
            owner_id: alert.owner_id,
            text: alert.message(),
        };

        match self.outbox.try_send(notification) {
            Ok(()) => {
                counter!("alerts_dispatched_total").increment(1);
            }
            Err(e) => {
                warn!("notification dropped for owner {}: {}", alert.owner_id, e);
                counter!("notifications_dropped_total").increment(1);
            }
        }
    }
}
