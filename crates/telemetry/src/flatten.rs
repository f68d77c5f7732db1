//! Recursive Document Flattening

use crate::{DocumentError, Measurement};
use chrono::NaiveDateTime;
use serde_json::{Map, Value};

/// Top-level key carrying the record's shared timestamp
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Classification of one node of a telemetry document.
///
/// A node is a leaf iff it is an object with a numeric `value` and a string
/// `unit`; any other object is a branch; everything else is skipped.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// Terminal `{value, unit}` object
    Leaf { value: f64, unit: &'a str },
    /// Internal object, recursion continues over its children
    Branch(&'a Map<String, Value>),
    /// Scalar, array, or malformed leaf; produces no measurement
    Other,
}

impl<'a> Node<'a> {
    /// Classify a raw JSON node.
    pub fn classify(raw: &'a Value) -> Self {
        let map = match raw {
            Value::Object(map) => map,
            _ => return Node::Other,
        };

        match (
            map.get("value").and_then(Value::as_f64),
            map.get("unit").and_then(Value::as_str),
        ) {
            (Some(value), Some(unit)) => Node::Leaf { value, unit },
            // Leaf-shaped but with a non-numeric value or non-string unit:
            // dropped rather than descended into.
            _ if map.contains_key("value") && map.contains_key("unit") => Node::Other,
            _ => Node::Branch(map),
        }
    }
}

/// Flatten one per-sensor sub-document into measurements.
///
/// Pure function: no side effects, and for the same input the output sequence
/// is identical, in the source document's key order.
pub fn flatten(
    owner_id: i64,
    timestamp: NaiveDateTime,
    sensor: &str,
    node: &Map<String, Value>,
) -> Vec<Measurement> {
    let mut out = Vec::new();
    flatten_into(owner_id, timestamp, sensor, node, "", &mut out);
    out
}

fn flatten_into(
    owner_id: i64,
    timestamp: NaiveDateTime,
    sensor: &str,
    node: &Map<String, Value>,
    prefix: &str,
    out: &mut Vec<Measurement>,
) {
    for (key, raw) in node {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match Node::classify(raw) {
            Node::Leaf { value, unit } => out.push(Measurement {
                owner_id,
                timestamp,
                sensor: sensor.to_string(),
                parameter: path,
                value,
                unit: unit.to_string(),
            }),
            Node::Branch(children) => {
                flatten_into(owner_id, timestamp, sensor, children, &path, out)
            }
            // Unrecognized shapes are dropped, not rejected, so malformed
            // siblings never block valid ones.
            Node::Other => {}
        }
    }
}

/// Flatten a whole record: extract the shared `timestamp` key, then flatten
/// every other top-level entry as a per-sensor sub-document.
pub fn flatten_record(owner_id: i64, record: &Value) -> Result<Vec<Measurement>, DocumentError> {
    let map = record.as_object().ok_or(DocumentError::NotAnObject)?;

    let raw_ts = map
        .get(TIMESTAMP_KEY)
        .ok_or(DocumentError::MissingTimestamp)?;
    let ts_str = raw_ts
        .as_str()
        .ok_or_else(|| DocumentError::InvalidTimestamp(raw_ts.to_string()))?;
    let timestamp: NaiveDateTime = ts_str
        .parse()
        .map_err(|_| DocumentError::InvalidTimestamp(ts_str.to_string()))?;

    let mut out = Vec::new();
    for (sensor, raw) in map {
        if sensor == TIMESTAMP_KEY {
            continue;
        }
        // Non-object sensor entries are skipped like any other unrecognized shape.
        if let Some(node) = raw.as_object() {
            out.extend(flatten(owner_id, timestamp, sensor, node));
        }
    }
    Ok(out)
}
