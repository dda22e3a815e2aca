//! Configuration for the node engine
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard cap on `max_limit`; larger pages should be fetched with `skip`
const MAX_SUPPORTED_LIMIT: usize = 100_000;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size of `find_many` when `first` is not given
    pub default_limit: usize,

    /// Largest accepted `first`
    pub max_limit: usize,

    /// Buffered changes per broadcast subscriber before it starts lagging
    pub event_channel_capacity: usize,

    /// `tracing_subscriber::EnvFilter` directives used by [`init_tracing`](Self::init_tracing)
    /// when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
            event_channel_capacity: 128,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration; missing keys take their default
    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read engine config {}: {}", path.display(), e)
        })?;
        Self::from_json_str(&input)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_limit == 0 {
            return Err("default_limit must be greater than 0".to_string());
        }

        if self.max_limit > MAX_SUPPORTED_LIMIT {
            return Err(format!("max_limit cannot exceed {}", MAX_SUPPORTED_LIMIT));
        }

        if self.default_limit > self.max_limit {
            return Err("default_limit cannot exceed max_limit".to_string());
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.log_filter.trim().is_empty() {
            return Err("log_filter cannot be empty".to_string());
        }

        Ok(())
    }

    /// Install a global fmt subscriber
    ///
    /// `RUST_LOG` wins over `log_filter`. Does nothing if a global subscriber
    /// is already installed.
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.log_filter));

        if tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already installed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.max_limit, 1000);
        assert_eq!(config.event_channel_capacity, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        // Invalid: zero default limit
        config.default_limit = 0;
        assert!(config.validate().is_err());

        // Invalid: default above max
        config.default_limit = 50;
        config.max_limit = 10;
        assert!(config.validate().is_err());

        // Invalid: excessive max limit
        config.max_limit = MAX_SUPPORTED_LIMIT + 1;
        assert!(config.validate().is_err());

        // Invalid: zero channel capacity
        config.max_limit = 100;
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());

        // Invalid: empty log filter
        config.event_channel_capacity = 16;
        config.log_filter = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "default_limit": 20 }"#).unwrap();
        assert_eq!(config.default_limit, 20);
        assert_eq!(config.max_limit, 1000);

        assert!(EngineConfig::from_json_str(r#"{ "default_limit": 0 }"#).is_err());
    }
}
