//! Pipeline Configuration

use alerting::NotifierConfig;
use outlier_detector::DetectorConfig;
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the API server
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub server: ServerConfig,
    pub detector: DetectorConfig,
    pub notifier: NotifierConfig,
}

impl PipelineConfig {
    /// Load from an optional `pipeline.toml` in the working directory,
    /// overridden by `PIPELINE_`-prefixed environment variables
    /// (e.g. `PIPELINE_SERVER__BIND_ADDR`).
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("pipeline").required(false))
            .add_source(config::Environment::with_prefix("PIPELINE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.detector.poll_interval_secs, 5);
        assert_eq!(config.detector.min_batch, 5);
        assert_eq!(config.detector.forest.contamination, 0.05);
        assert_eq!(config.detector.forest.seed, 42);
        assert_eq!(config.notifier.timeout_ms, 2000);
    }
}
