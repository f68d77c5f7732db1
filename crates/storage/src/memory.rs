//! In-Memory Append Log

use crate::{MeasurementFilter, MeasurementStore, QueryOrder, StorageError};
use std::sync::Mutex;
use telemetry::Measurement;
use tracing::debug;

/// In-process reference implementation of the store contract.
///
/// A single mutex guards the log, so appends are atomic per call and ids are
/// strictly increasing.
pub struct MemoryStore {
    rows: Mutex<Vec<(u64, Measurement)>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<(u64, Measurement)>>, StorageError> {
        self.rows
            .lock()
            .map_err(|e| StorageError::Backend(format!("lock error: {e}")))
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    /// Whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementStore for MemoryStore {
    fn append(&self, measurement: Measurement) -> Result<u64, StorageError> {
        let mut rows = self.lock()?;
        // The log is append-only, so the last id is the maximum.
        let id = rows.last().map(|(id, _)| id + 1).unwrap_or(1);
        rows.push((id, measurement));
        debug!("appended measurement {}", id);
        Ok(id)
    }

    fn query(
        &self,
        filter: &MeasurementFilter,
        order: QueryOrder,
        limit: usize,
    ) -> Result<Vec<Measurement>, StorageError> {
        let rows = self.lock()?;
        let matching = rows.iter().filter(|(_, m)| filter.matches(m));
        Ok(match order {
            QueryOrder::NewestFirst => matching
                .rev()
                .take(limit)
                .map(|(_, m)| m.clone())
                .collect(),
            QueryOrder::OldestFirst => {
                matching.take(limit).map(|(_, m)| m.clone()).collect()
            }
        })
    }

    fn scan_since(&self, cursor: u64) -> Result<Vec<(u64, Measurement)>, StorageError> {
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .filter(|(id, _)| *id > cursor)
            .cloned()
            .collect())
    }
}
