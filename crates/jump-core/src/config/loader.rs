//! Configuration loader for YAML files and environment overrides
//!
//! Values are resolved in order: built-in defaults, then `jump.yaml` (or an
//! explicit path), then `JUMP_*` environment variables.

use std::env;
use std::path::Path;
use tokio::fs;

use crate::config::types::HarnessConfig;
use crate::errors::JumpError;

pub const DEFAULT_CONFIG_FILE: &str = "jump.yaml";

pub const ENV_WORK_DIR: &str = "JUMP_WORK_DIR";
pub const ENV_WAIT_TIMEOUT: &str = "JUMP_WAIT_TIMEOUT_SECS";
pub const ENV_SHARED_DIR: &str = "JUMP_SHARED_DIR";

pub struct ConfigLoader;
impl ConfigLoader {
    /// Load from `path`, or from `jump.yaml` in the current directory when it
    /// exists, then apply environment overrides and validate.
    pub async fn load(path: Option<&Path>) -> Result<HarnessConfig, JumpError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(DEFAULT_CONFIG_FILE).await?
            }
            None => HarnessConfig::default(),
        };

        Self::apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<HarnessConfig, JumpError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            JumpError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<HarnessConfig, JumpError> {
        if content.trim().is_empty() {
            return Ok(HarnessConfig::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| JumpError::Config(format!("Failed to parse YAML config: {}", e)))
    }

    /// Apply `JUMP_*` environment variables on top of `config`.
    pub fn apply_env(config: &mut HarnessConfig) -> Result<(), JumpError> {
        if let Ok(work_dir) = env::var(ENV_WORK_DIR) {
            config.work_dir = work_dir;
        }
        if let Ok(shared_dir) = env::var(ENV_SHARED_DIR) {
            config.shared_dir = shared_dir;
        }
        if let Ok(timeout) = env::var(ENV_WAIT_TIMEOUT) {
            let seconds = timeout.trim().parse::<u64>().map_err(|e| {
                JumpError::Config(format!("Invalid {} '{}': {}", ENV_WAIT_TIMEOUT, timeout, e))
            })?;
            config.wait_timeout_secs = Some(seconds);
        }
        Ok(())
    }
}
