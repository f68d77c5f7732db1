//! Measurement Store
//!
//! Access contract for the append-only measurement relation, plus the
//! in-memory reference implementation. The store itself is an external
//! collaborator; handles are explicit values passed to each component, never
//! process-wide state.

mod memory;

pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use telemetry::Measurement;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The backing store rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backing store could not be reached; callers retry the whole batch
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Row ordering for `query`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter for `query`; unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementFilter {
    pub owner_id: Option<i64>,
    pub sensor: Option<String>,
    pub parameter: Option<String>,
}

impl MeasurementFilter {
    /// Whether a measurement passes the filter.
    pub fn matches(&self, m: &Measurement) -> bool {
        self.owner_id.map_or(true, |owner| owner == m.owner_id)
            && self.sensor.as_deref().map_or(true, |s| s == m.sensor)
            && self.parameter.as_deref().map_or(true, |p| p == m.parameter)
    }
}

/// Append-only measurement relation.
///
/// `append` must be atomic per call and assign strictly increasing ids. No
/// deletions, no updates.
pub trait MeasurementStore: Send + Sync {
    /// Append one measurement, returning its stored id.
    fn append(&self, measurement: Measurement) -> Result<u64, StorageError>;

    /// Filtered lookup in the requested order.
    fn query(
        &self,
        filter: &MeasurementFilter,
        order: QueryOrder,
        limit: usize,
    ) -> Result<Vec<Measurement>, StorageError>;

    /// Rows with id strictly greater than `cursor`, ascending by id.
    ///
    /// Used exclusively by the outlier detector.
    fn scan_since(&self, cursor: u64) -> Result<Vec<(u64, Measurement)>, StorageError>;
}
