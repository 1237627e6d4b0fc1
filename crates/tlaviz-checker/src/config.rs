//! Runner configuration.
//!
//! A [`RunnerConfig`] describes how the checker is invoked: which Java
//! runtime and `tla2tools.jar` to use, extra JVM and tool arguments, and the
//! limits applied to a run. It can be read from TOML either flat or nested
//! under a `[runner]` table.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration for launching TLC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Java home directory. When unset, `java` is resolved from `PATH`.
    pub java_home: Option<PathBuf>,

    /// Path to `tla2tools.jar`.
    pub tla2tools_path: PathBuf,

    /// JVM heap size in megabytes.
    pub heap_size_mb: Option<u32>,

    /// Additional JVM arguments, placed before `-jar`.
    pub jvm_args: Vec<String>,

    /// Additional tool arguments, placed after the spec and config.
    pub tlc_args: Vec<String>,

    /// Number of TLC worker threads.
    pub workers: Option<u32>,

    /// Working directory. Defaults to the spec's parent directory.
    pub work_dir: Option<PathBuf>,

    /// Wall-clock limit in seconds, 0 for none.
    pub timeout_secs: u64,

    /// Whether cancelling a job also kills the checker process.
    pub kill_on_cancel: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            java_home: None,
            tla2tools_path: PathBuf::from("tla2tools.jar"),
            heap_size_mb: None,
            jvm_args: Vec::new(),
            tlc_args: Vec::new(),
            workers: None,
            work_dir: None,
            timeout_secs: 0,
            kill_on_cancel: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigShape {
    Nested { runner: RunnerConfig },
    Flat(RunnerConfig),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl RunnerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        match toml::from_str::<ConfigShape>(input)? {
            ConfigShape::Nested { runner } => Ok(runner),
            ConfigShape::Flat(config) => Ok(config),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.display().to_string();
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })
    }

    /// Returns the timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tla2tools_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "tla2tools_path must not be empty".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.heap_size_mb == Some(0) {
            return Err(ConfigError::Invalid(
                "heap_size_mb must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
