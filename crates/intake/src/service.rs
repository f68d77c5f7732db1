//! Ingestion Service

use crate::IntakeError;
use alerting::{Alert, AlertDispatcher};
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use storage::MeasurementStore;
use telemetry::flatten_record;
use thresholds::ThresholdRegister;
use tracing::debug;

/// Counts returned to the intake caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Measurements persisted
    pub inserted: usize,
    /// Threshold alerts raised
    pub threshold_alerts: usize,
}

/// Batch document ingestion.
pub struct IntakeService {
    store: Arc<dyn MeasurementStore>,
    thresholds: Arc<ThresholdRegister>,
    dispatcher: AlertDispatcher,
}

impl IntakeService {
    /// Wire the ingestion path to its collaborators.
    pub fn new(
        store: Arc<dyn MeasurementStore>,
        thresholds: Arc<ThresholdRegister>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            store,
            thresholds,
            dispatcher,
        }
    }

    /// Ingest one batch of records for one owner.
    ///
    /// Records are flattened up front, so a malformed record rejects the
    /// batch before anything is stored. A storage failure mid-batch aborts
    /// the rest; already-appended rows stay (retries may duplicate them).
    pub fn ingest_batch(
        &self,
        owner_id: i64,
        records: &[Value],
    ) -> Result<IngestReport, IntakeError> {
        let mut measurements = Vec::new();
        for record in records {
            measurements.extend(flatten_record(owner_id, record)?);
        }

        let mut report = IngestReport::default();
        for measurement in measurements {
            self.store.append(measurement.clone())?;
            report.inserted += 1;

            if let Some(threshold) =
                self.thresholds
                    .lookup(owner_id, &measurement.sensor, &measurement.parameter)
            {
                if threshold.is_breached(measurement.value) {
                    report.threshold_alerts += 1;
                    self.dispatcher.dispatch(&Alert::threshold_breach(
                        &measurement,
                        threshold.lower,
                        threshold.upper,
                    ));
                }
            }
        }

        counter!("measurements_ingested_total").increment(report.inserted as u64);
        counter!("threshold_alerts_total").increment(report.threshold_alerts as u64);
        debug!(
            "ingested {} measurements for owner {} ({} threshold alerts)",
            report.inserted, owner_id, report.threshold_alerts
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::Notification;
    use serde_json::json;
    use storage::{MeasurementFilter, MemoryStore, QueryOrder, StorageError};
    use telemetry::Measurement;
    use tokio::sync::mpsc;

    struct Harness {
        store: Arc<MemoryStore>,
        thresholds: Arc<ThresholdRegister>,
        service: IntakeService,
        outbox: mpsc::Receiver<Notification>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let thresholds = Arc::new(ThresholdRegister::new());
        let (tx, rx) = mpsc::channel(64);
        let service = IntakeService::new(
            store.clone(),
            thresholds.clone(),
            AlertDispatcher::new(tx),
        );
        Harness {
            store,
            thresholds,
            service,
            outbox: rx,
        }
    }

    fn temp_record(value: f64) -> Value {
        json!({
            "timestamp": "2024-01-01T00:00:00",
            "tempSensor": { "core": { "value": value, "unit": "C" } }
        })
    }

    #[test]
    fn test_breaching_measurement_raises_one_alert() {
        let mut h = harness();
        h.thresholds.upsert(42, "tempSensor", "core", 0.0, 100.0);

        let report = h.service.ingest_batch(42, &[temp_record(105.0)]).unwrap();
        assert_eq!(
            report,
            IngestReport {
                inserted: 1,
                threshold_alerts: 1
            }
        );

        let notification = h.outbox.try_recv().unwrap();
        assert_eq!(notification.owner_id, 42);
        assert!(notification.text.contains("Threshold breach"));
        assert!(notification.text.contains("105"));
        assert_eq!(h.store.len(), 1);
    }

    #[test]
    fn test_no_threshold_means_no_alert() {
        let mut h = harness();

        let report = h.service.ingest_batch(42, &[temp_record(105.0)]).unwrap();
        assert_eq!(
            report,
            IngestReport {
                inserted: 1,
                threshold_alerts: 0
            }
        );
        assert!(h.outbox.try_recv().is_err());
    }

    #[test]
    fn test_bound_equality_is_in_range() {
        let mut h = harness();
        h.thresholds.upsert(42, "tempSensor", "core", 0.0, 100.0);

        let report = h
            .service
            .ingest_batch(42, &[temp_record(100.0), temp_record(0.0)])
            .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.threshold_alerts, 0);
        assert!(h.outbox.try_recv().is_err());
    }

    #[test]
    fn test_thresholds_are_scoped_to_the_owner() {
        let mut h = harness();
        h.thresholds.upsert(7, "tempSensor", "core", 0.0, 100.0);

        let report = h.service.ingest_batch(42, &[temp_record(105.0)]).unwrap();
        assert_eq!(report.threshold_alerts, 0);
        assert!(h.outbox.try_recv().is_err());
    }

    #[test]
    fn test_batch_concatenates_record_counts() {
        let h = harness();

        let records = vec![
            temp_record(20.0),
            json!({
                "timestamp": "2024-01-01T00:05:00",
                "tempSensor": { "core": { "value": 21.0, "unit": "C" } },
                "humSensor": { "rel": { "value": 40.0, "unit": "%" } }
            }),
        ];
        let report = h.service.ingest_batch(42, &records).unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(h.store.len(), 3);
    }

    #[test]
    fn test_malformed_record_rejects_batch_before_storing() {
        let h = harness();

        let records = vec![temp_record(20.0), json!({ "no": "timestamp" })];
        let result = h.service.ingest_batch(42, &records);

        assert!(matches!(result, Err(IntakeError::InvalidDocument(_))));
        assert_eq!(h.store.len(), 0);
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
    fn test_storage_failure_aborts_the_batch() {
        let (tx, _rx) = mpsc::channel(4);
        let service = IntakeService::new(
            Arc::new(FailingStore),
            Arc::new(ThresholdRegister::new()),
            AlertDispatcher::new(tx),
        );

        let result = service.ingest_batch(42, &[temp_record(20.0)]);
        assert!(matches!(result, Err(IntakeError::Storage(_))));
    }
}
