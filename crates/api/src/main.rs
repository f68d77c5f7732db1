//! Telemetry Anomaly Pipeline - Main Entry Point

use alerting::{AlertDispatcher, HttpNotifier};
use api::{init_logging, run_server, AppState, PipelineConfig};
use intake::IntakeService;
use outlier_detector::OutlierDetector;
use std::sync::Arc;
use storage::{MeasurementStore, MemoryStore};
use thresholds::ThresholdRegister;
use tokio::sync::{mpsc, watch};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Telemetry Anomaly Pipeline v{} ===", env!("CARGO_PKG_VERSION"));
    let settings = PipelineConfig::load()?;

    let store: Arc<dyn MeasurementStore> = Arc::new(MemoryStore::new());
    let registry = Arc::new(ThresholdRegister::new());

    // Notification path: dispatcher -> bounded queue -> HTTP forwarder.
    let (outbox_tx, outbox_rx) = mpsc::channel(settings.notifier.queue_capacity);
    let dispatcher = AlertDispatcher::new(outbox_tx);
    let notifier = HttpNotifier::new(&settings.notifier)?;
    tokio::spawn(notifier.run(outbox_rx));

    // Detection path: independent periodic task, coupled to ingestion only
    // through the store.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let detector = OutlierDetector::new(
        settings.detector.clone(),
        Arc::clone(&store),
        dispatcher.clone(),
    );
    let detector_task = tokio::spawn(detector.run(shutdown_rx));

    let intake = IntakeService::new(Arc::clone(&store), Arc::clone(&registry), dispatcher);
    let state = Arc::new(AppState::new(intake, store, registry)?);

    run_server(&settings.server.bind_addr, state).await?;

    // Stop the detector between ticks.
    let _ = shutdown_tx.send(true);
    let _ = detector_task.await;

    Ok(())
}
