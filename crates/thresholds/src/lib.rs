//! Threshold Register
//!
//! Static per (owner, sensor, parameter) bounds, looked up synchronously
//! during ingestion. Latest upsert always governs; no history, no expiry.

mod register;

pub use register::{Threshold, ThresholdRegister};
