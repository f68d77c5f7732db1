//! Outlier Detection
//!
//! Recurring scan of unseen measurements against an isolation forest trained
//! afresh on each batch. Per-window scoring only: no model state survives
//! between passes, so each batch is scored against itself.

mod detector;
mod forest;

pub use detector::{DetectorConfig, OutlierDetector, PassReport};
pub use forest::{ForestConfig, IsolationForest};
