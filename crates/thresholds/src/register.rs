//! Threshold Register Implementation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Inclusive `[lower, upper]` bounds for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub lower: f64,
    pub upper: f64,
}

impl Threshold {
    /// Create bounds.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Breach rule: strictly outside the bounds. Equality at either bound is
    /// in range.
    pub fn is_breached(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

type ThresholdKey = (i64, String, String);

/// Register of thresholds keyed by (owner, sensor, parameter).
///
/// Reads happen on the ingestion hot path; writes only on upsert.
#[derive(Debug, Default)]
pub struct ThresholdRegister {
    entries: RwLock<HashMap<ThresholdKey, Threshold>>,
}

impl ThresholdRegister {
    /// Create an empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent replace keyed by the triple; last write wins.
    pub fn upsert(&self, owner_id: i64, sensor: &str, parameter: &str, lower: f64, upper: f64) {
        let key = (owner_id, sensor.to_string(), parameter.to_string());
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            // A poisoned lock still holds a consistent map.
            Err(poisoned) => poisoned.into_inner(),
        };
        debug!(
            "threshold upsert for owner {} {}.{}: [{}, {}]",
            owner_id, sensor, parameter, lower, upper
        );
        entries.insert(key, Threshold::new(lower, upper));
    }

    /// Latest bounds for the triple, if any.
    pub fn lookup(&self, owner_id: i64, sensor: &str, parameter: &str) -> Option<Threshold> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(&(owner_id, sensor.to_string(), parameter.to_string()))
            .copied()
    }

    /// Number of registered thresholds.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the register is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
