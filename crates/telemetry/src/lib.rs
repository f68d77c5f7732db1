//! Telemetry Document Model
//!
//! Defines the canonical `Measurement` tuple and the flattener that turns
//! nested per-sensor documents into sequences of measurements.

mod flatten;
mod measurement;

pub use flatten::{flatten, flatten_record, Node, TIMESTAMP_KEY};
pub use measurement::Measurement;

use thiserror::Error;

/// Errors raised while unpacking a telemetry record
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    /// Record is not a JSON object
    #[error("record is not an object")]
    NotAnObject,

    /// Record carries no `timestamp` sibling key
    #[error("record is missing the timestamp key")]
    MissingTimestamp,

    /// Timestamp could not be parsed as a datetime
    #[error("unparsable timestamp: {0}")]
    InvalidTimestamp(String),
}
