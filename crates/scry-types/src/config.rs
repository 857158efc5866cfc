use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Result, ScryError};

/// Holding a live-game verdict for less than this invites flicker between
/// poll cycles.
pub const MIN_MEMBERSHIP_HOLD_SECS: u64 = 25;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub summoner_ttl_secs: u64,
    pub analysis_ttl_secs: u64,
    pub poll_interval_secs: u64,
    pub membership_hold_secs: u64,
    pub slow_hint_ms: u64,
}

impl PipelineConfig {
    pub fn summoner_ttl(&self) -> Duration {
        Duration::from_secs(self.summoner_ttl_secs)
    }

    pub fn analysis_ttl(&self) -> Duration {
        Duration::from_secs(self.analysis_ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn membership_hold(&self) -> Duration {
        Duration::from_secs(self.membership_hold_secs)
    }

    pub fn slow_hint(&self) -> Duration {
        Duration::from_millis(self.slow_hint_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScryConfig {
    pub api: ApiConfig,
    pub pipeline: PipelineConfig,
    pub ops: OpsConfig,
}

impl ScryConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            ScryError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            ScryError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ScryError::Configuration(
                "api.base_url must not be empty".into(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(ScryError::Configuration(
                "api.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.pipeline.summoner_ttl_secs == 0 || self.pipeline.analysis_ttl_secs == 0 {
            return Err(ScryError::Configuration(
                "pipeline cache TTLs must be greater than zero".into(),
            ));
        }
        if self.pipeline.poll_interval_secs == 0 {
            return Err(ScryError::Configuration(
                "pipeline.poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.pipeline.membership_hold_secs < MIN_MEMBERSHIP_HOLD_SECS {
            return Err(ScryError::Configuration(format!(
                "pipeline.membership_hold_secs must be at least {MIN_MEMBERSHIP_HOLD_SECS}"
            )));
        }
        if self.pipeline.membership_hold_secs >= self.pipeline.poll_interval_secs {
            return Err(ScryError::Configuration(
                "pipeline.membership_hold_secs must be shorter than the poll interval".into(),
            ));
        }
        if self.pipeline.slow_hint_ms == 0 {
            return Err(ScryError::Configuration(
                "pipeline.slow_hint_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_config() -> ScryConfig {
        ScryConfig {
            api: ApiConfig {
                base_url: "http://127.0.0.1:8000/api/v1".into(),
                timeout_secs: 10,
            },
            pipeline: PipelineConfig {
                summoner_ttl_secs: 300,
                analysis_ttl_secs: 120,
                poll_interval_secs: 30,
                membership_hold_secs: 28,
                slow_hint_ms: 1500,
            },
            ops: OpsConfig {
                log_level: "info".into(),
            },
        }
    }

    #[test]
    fn load_config_from_file() {
        let temp_path = std::env::temp_dir().join("scry-config-test.toml");
        let config = sample_config();

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = ScryConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.api.base_url, config.api.base_url);
        assert_eq!(
            loaded.pipeline.poll_interval_secs,
            config.pipeline.poll_interval_secs
        );
        assert_eq!(loaded.pipeline.slow_hint_ms, config.pipeline.slow_hint_ms);
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = sample_config();
        assert!(config.validate().is_ok());

        config.api.base_url = "  ".into();
        assert!(config.validate().is_err());
        config.api.base_url = "http://127.0.0.1:8000/api/v1".into();

        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.api.timeout_secs = 10;

        config.pipeline.analysis_ttl_secs = 0;
        assert!(config.validate().is_err());
        config.pipeline.analysis_ttl_secs = 120;

        config.pipeline.membership_hold_secs = 10;
        assert!(config.validate().is_err());
        config.pipeline.membership_hold_secs = 30;
        assert!(config.validate().is_err());
        config.pipeline.membership_hold_secs = 28;

        config.pipeline.slow_hint_ms = 0;
        assert!(config.validate().is_err());
        config.pipeline.slow_hint_ms = 1500;

        assert!(config.validate().is_ok());
    }
}
