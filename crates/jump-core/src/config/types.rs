//! Configuration types for the execution harness

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::companion::DEFAULT_SHARED_DIR;
use crate::container::DEFAULT_CAPTURE_LIMIT;
use crate::errors::JumpError;
use crate::runtime::{RuntimeDescriptor, RuntimeFamily, RuntimeRegistry};

pub const DEFAULT_WORK_DIR: &str = "/app";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory inside the container where files are staged and run.
    pub work_dir: String,
    /// Upper bound on how long a container may run; unbounded when unset.
    pub wait_timeout_secs: Option<u64>,
    /// Name of the directory, next to the problem directory, holding test runners.
    pub shared_dir: String,
    /// Prefix collected output with engine timestamps. Follows `verbose` when unset.
    pub timestamps: Option<bool>,
    /// Bytes of each output stream kept in memory after a run.
    pub capture_limit_bytes: usize,
    /// Extra or replacement runtimes keyed by file extension.
    pub runtimes: BTreeMap<String, RuntimeOverride>,
    /// Verbose diagnostics; set from the command line only.
    #[serde(skip)]
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            work_dir: DEFAULT_WORK_DIR.to_string(),
            wait_timeout_secs: None,
            shared_dir: DEFAULT_SHARED_DIR.to_string(),
            timestamps: None,
            capture_limit_bytes: DEFAULT_CAPTURE_LIMIT,
            runtimes: BTreeMap::new(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeOverride {
    pub name: Option<String>,
    pub image: String,
    pub family: RuntimeFamily,
}

impl HarnessConfig {
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_timestamps(&self) -> bool {
        self.timestamps.unwrap_or(self.verbose)
    }

    /// Built-in runtimes with the configured overrides applied.
    pub fn registry(&self) -> RuntimeRegistry {
        let mut registry = RuntimeRegistry::builtin();
        for (extension, runtime) in &self.runtimes {
            let extension = extension.trim_start_matches('.');
            let name = runtime.name.as_deref().unwrap_or(extension);
            registry.insert(
                extension,
                RuntimeDescriptor::new(name, &runtime.image, extension, runtime.family.clone()),
            );
        }
        registry
    }

    pub fn validate(&self) -> Result<(), JumpError> {
        if !self.work_dir.starts_with('/') {
            return Err(JumpError::Config(format!(
                "work_dir must be an absolute container path, got '{}'",
                self.work_dir
            )));
        }
        if self.wait_timeout_secs == Some(0) {
            return Err(JumpError::Config(
                "wait_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.shared_dir.trim().is_empty() {
            return Err(JumpError::Config("shared_dir must not be empty".to_string()));
        }
        for (extension, runtime) in &self.runtimes {
            if extension.trim_start_matches('.').is_empty() {
                return Err(JumpError::Config(
                    "runtime overrides need a file extension".to_string(),
                ));
            }
            if runtime.image.trim().is_empty() {
                return Err(JumpError::Config(format!(
                    "runtime '{}' has an empty image",
                    extension
                )));
            }
        }
        Ok(())
    }
}
