//! Periodic Scan Task

use crate::{ForestConfig, IsolationForest};
use alerting::{Alert, AlertDispatcher};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storage::{MeasurementStore, StorageError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Seconds between scan passes (default: 5)
    pub poll_interval_secs: u64,
    /// Smallest batch worth scoring (default: 5); smaller batches still
    /// advance the cursor
    pub min_batch: usize,
    /// Model parameters
    pub forest: ForestConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            min_batch: 5,
            forest: ForestConfig::default(),
        }
    }
}

/// Outcome of one scan pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Rows returned by the scan
    pub scanned: usize,
    /// Rows flagged and dispatched as outlier alerts
    pub flagged: usize,
}

/// Recurring scorer of unseen measurements.
///
/// The cursor is single-owner: only this task mutates it, and only after a
/// successful scan. It is process-ephemeral, so a restarted detector rescans
/// from the beginning (at-least-once alerting).
pub struct OutlierDetector {
    config: DetectorConfig,
    store: Arc<dyn MeasurementStore>,
    dispatcher: AlertDispatcher,
    last_seen_id: u64,
}

impl OutlierDetector {
    /// Create a detector starting from the beginning of the store.
    pub fn new(
        config: DetectorConfig,
        store: Arc<dyn MeasurementStore>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            config,
            store,
            dispatcher,
            last_seen_id: 0,
        }
    }

    /// Highest stored id already scanned.
    pub fn last_seen_id(&self) -> u64 {
        self.last_seen_id
    }

    /// One scan pass: read unseen rows, advance the cursor, score the batch,
    /// dispatch an alert per flagged row.
    ///
    /// A scan failure leaves the cursor untouched so the next tick retries
    /// from the same point.
    pub fn run_once(&mut self) -> Result<PassReport, StorageError> {
        let batch = self.store.scan_since(self.last_seen_id)?;
        if batch.is_empty() {
            return Ok(PassReport {
                scanned: 0,
                flagged: 0,
            });
        }

        // Unconditional: a batch too small to score must never be rescanned.
        if let Some((id, _)) = batch.last() {
            self.last_seen_id = *id;
        }
        counter!("detector_passes_total").increment(1);

        if batch.len() <= self.config.min_batch {
            debug!(
                "batch of {} below scoring minimum {}, cursor advanced to {}",
                batch.len(),
                self.config.min_batch,
                self.last_seen_id
            );
            return Ok(PassReport {
                scanned: batch.len(),
                flagged: 0,
            });
        }

        let values: Vec<f64> = batch.iter().map(|(_, m)| m.value).collect();
        let labels = IsolationForest::fit_predict(&self.config.forest, &values);

        let mut flagged = 0;
        for ((_, measurement), is_outlier) in batch.iter().zip(&labels) {
            if *is_outlier {
                flagged += 1;
                self.dispatcher.dispatch(&Alert::outlier(measurement));
            }
        }

        if flagged > 0 {
            info!(
                "flagged {} of {} measurements up to id {}",
                flagged,
                batch.len(),
                self.last_seen_id
            );
        }
        counter!("outlier_alerts_total").increment(flagged as u64);

        Ok(PassReport {
            scanned: batch.len(),
            flagged,
        })
    }

    /// Run scan passes on the configured interval until the shutdown signal
    /// flips. Stops between ticks; the cursor value is kept to the end.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "outlier detector started (every {}s, min batch {})",
            self.config.poll_interval_secs, self.config.min_batch
        );
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once() {
                        warn!(
                            "scan failed, retrying from id {} next tick: {}",
                            self.last_seen_id, e
                        );
                    }
                }
                _ = shutdown.changed() => {
                    info!("outlier detector stopped at id {}", self.last_seen_id);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::Notification;
    use chrono::NaiveDate;
    use storage::{MeasurementFilter, MemoryStore, QueryOrder};
    use telemetry::Measurement;
    use tokio::sync::mpsc;

    fn measurement(value: f64) -> Measurement {
        Measurement {
            owner_id: 42,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            sensor: "tempSensor".to_string(),
            parameter: "core".to_string(),
            value,
            unit: "C".to_string(),
        }
    }

    fn detector_over(
        store: Arc<dyn MeasurementStore>,
    ) -> (OutlierDetector, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(64);
        let detector = OutlierDetector::new(
            DetectorConfig::default(),
            store,
            AlertDispatcher::new(tx),
        );
        (detector, rx)
    }

    struct FailingStore;

    impl MeasurementStore for FailingStore {
        fn append(&self, _measurement: Measurement) -> Result<u64, StorageError> {
            Err(StorageError::Unavailable("store offline".to_string()))
        }

        fn query(
            &self,
            _filter: &MeasurementFilter,
            _order: QueryOrder,
            _limit: usize,
        ) -> Result<Vec<Measurement>, StorageError> {
            Err(StorageError::Unavailable("store offline".to_string()))
        }

        fn scan_since(&self, _cursor: u64) -> Result<Vec<(u64, Measurement)>, StorageError> {
            Err(StorageError::Unavailable("store offline".to_string()))
        }
    }

    #[test]
    fn test_empty_scan_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let (mut detector, _rx) = detector_over(store);

        let report = detector.run_once().unwrap();
        assert_eq!(report, PassReport { scanned: 0, flagged: 0 });
        assert_eq!(detector.last_seen_id(), 0);
    }

    #[test]
    fn test_small_batch_advances_cursor_without_alerts() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..4 {
            store.append(measurement(20.0 + i as f64)).unwrap();
        }
        let (mut detector, mut rx) = detector_over(store);

        let report = detector.run_once().unwrap();
        assert_eq!(report, PassReport { scanned: 4, flagged: 0 });
        assert_eq!(detector.last_seen_id(), 4);
        assert!(rx.try_recv().is_err());

        // Nothing new: the tiny batch is not rescanned.
        let report = detector.run_once().unwrap();
        assert_eq!(report.scanned, 0);
        assert_eq!(detector.last_seen_id(), 4);
    }

    #[test]
    fn test_cursor_never_decreases() {
        let store = Arc::new(MemoryStore::new());
        store.append(measurement(1.0)).unwrap();
        let (mut detector, _rx) = detector_over(store.clone());

        let mut previous = detector.last_seen_id();
        for round in 0..3 {
            detector.run_once().unwrap();
            assert!(detector.last_seen_id() >= previous);
            previous = detector.last_seen_id();
            store.append(measurement(round as f64)).unwrap();
        }
    }

    #[test]
    fn test_cluster_with_one_outlier_flags_only_it() {
        let store = Arc::new(MemoryStore::new());
        for v in [20.1, 19.8, 20.4, 19.6, 20.0, 20.3, 19.9, 20.2, 19.7, 9999.0] {
            store.append(measurement(v)).unwrap();
        }
        let (mut detector, mut rx) = detector_over(store);

        let report = detector.run_once().unwrap();
        assert_eq!(report, PassReport { scanned: 10, flagged: 1 });
        assert_eq!(detector.last_seen_id(), 10);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.owner_id, 42);
        assert!(notification.text.contains("Anomaly detected"));
        assert!(notification.text.contains("9999"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_scan_failure_leaves_cursor_untouched() {
        let (mut detector, _rx) = detector_over(Arc::new(FailingStore));

        assert!(detector.run_once().is_err());
        assert_eq!(detector.last_seen_id(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let store = Arc::new(MemoryStore::new());
        let (detector, _rx) = detector_over(store);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(detector.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
