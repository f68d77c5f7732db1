//! Alert Type and Message Formatting

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use telemetry::Measurement;

/// Why an alert was raised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlertReason {
    /// Registered static bounds were breached
    Threshold { lower: f64, upper: f64 },
    /// Flagged anomalous by the outlier model for its scan window
    Outlier,
}

/// Ephemeral alert: produced, dispatched, discarded. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub owner_id: i64,
    pub sensor: String,
    pub parameter: String,
    pub value: f64,
    pub timestamp: NaiveDateTime,
    pub reason: AlertReason,
}

impl Alert {
    /// Alert for a measurement outside its registered bounds.
    pub fn threshold_breach(measurement: &Measurement, lower: f64, upper: f64) -> Self {
        Self {
            owner_id: measurement.owner_id,
            sensor: measurement.sensor.clone(),
            parameter: measurement.parameter.clone(),
            value: measurement.value,
            timestamp: measurement.timestamp,
            reason: AlertReason::Threshold { lower, upper },
        }
    }

    /// Alert for a measurement the outlier model flagged.
    pub fn outlier(measurement: &Measurement) -> Self {
        Self {
            owner_id: measurement.owner_id,
            sensor: measurement.sensor.clone(),
            parameter: measurement.parameter.clone(),
            value: measurement.value,
            timestamp: measurement.timestamp,
            reason: AlertReason::Outlier,
        }
    }

    /// Human-readable notification text.
    pub fn message(&self) -> String {
        match self.reason {
            AlertReason::Threshold { lower, upper } => format!(
                "Threshold breach\nSensor: {}.{}\nValue: {}\nBounds: [{}, {}]\nTime: {}",
                self.sensor, self.parameter, self.value, lower, upper, self.timestamp
            ),
            AlertReason::Outlier => format!(
                "Anomaly detected\nSensor: {}.{}\nValue: {}\nTime: {}",
                self.sensor, self.parameter, self.value, self.timestamp
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn measurement() -> Measurement {
        Measurement {
            owner_id: 42,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            sensor: "tempSensor".to_string(),
            parameter: "core".to_string(),
            value: 105.0,
            unit: "C".to_string(),
        }
    }

    #[test]
    fn test_threshold_message_embeds_bounds() {
        let alert = Alert::threshold_breach(&measurement(), 0.0, 100.0);
        let text = alert.message();

        assert!(text.contains("tempSensor.core"));
        assert!(text.contains("105"));
        assert!(text.contains("[0, 100]"));
        assert!(text.contains("2024-01-01"));
    }

    #[test]
    fn test_outlier_message_has_anomaly_marker() {
        let alert = Alert::outlier(&measurement());
        let text = alert.message();

        assert!(text.starts_with("Anomaly detected"));
        assert!(text.contains("tempSensor.core"));
        assert!(!text.contains("Bounds"));
    }
}
