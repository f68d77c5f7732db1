//! Canonical Measurement Tuple

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One flattened telemetry fact.
///
/// Immutable once produced; the store appends these without deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Identity of the reporting principal
    pub owner_id: i64,
    /// Point in time asserted by the source, not ingestion time
    pub timestamp: NaiveDateTime,
    /// Device/source name
    pub sensor: String,
    /// Dotted path of the leaf inside the original document, e.g. `engine.temp.core`
    pub parameter: String,
    /// Measured value
    pub value: f64,
    /// Unit string, informational only
    pub unit: String,
}
