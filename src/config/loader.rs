use super::ReceiverConfig;
use crate::error::ConfigError;
use crate::security::normalize_secret;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl ReceiverConfig {
    /// Build the runtime configuration: defaults, then the optional TOML
    /// file, then environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(ConfigError::from)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .map_err(|error| ConfigError::Load(error.to_string()))
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.token = config.token.as_deref().and_then(normalize_secret);
        config.hmac_secret = config.hmac_secret.as_deref().and_then(normalize_secret);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hmac_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "hmac_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.replay_max_entries == 0 {
            return Err(ConfigError::Validation(
                "replay_max_entries must be greater than 0".into(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation("host must not be empty".into()));
        }
        Ok(())
    }
}
