//! Intake Handling
//!
//! Request-synchronous ingestion path: flatten each record, persist every
//! measurement, check static thresholds, and hand breaches to the alert
//! dispatcher.

mod service;

pub use service::{IngestReport, IntakeService};

use storage::StorageError;
use telemetry::DocumentError;
use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Client-side document problem; rejected before any row is stored
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] DocumentError),

    /// Store failure; the caller retries the whole batch (duplicate rows on
    /// retry are tolerated, the store is append-only)
    #[error(transparent)]
    Storage(#[from] StorageError),
}
