//! Configuration for the tlaviz binary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tlaviz_checker::RunnerConfig;
use tlaviz_report::LayoutConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// How TLC is launched.
    pub runner: RunnerConfig,

    /// State-graph layout.
    pub layout: LayoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (pretty, json, compact).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merges CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &super::CliArgs) {
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if let Some(ref jar) = args.tla2tools {
            self.runner.tla2tools_path = jar.clone();
        }

        if let Some(ref java_home) = args.java_home {
            self.runner.java_home = Some(java_home.clone());
        }

        if let Some(workers) = args.workers {
            self.runner.workers = Some(workers);
        }

        if let Some(timeout) = args.timeout_secs {
            self.runner.timeout_secs = timeout;
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        if !(self.layout.base_radius.is_finite() && self.layout.base_radius > 0.0) {
            anyhow::bail!("Invalid layout radius: {}", self.layout.base_radius);
        }

        self.runner.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.layout.base_radius, 200.0);
        assert_eq!(config.runner.tla2tools_path, PathBuf::from("tla2tools.jar"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "debug".to_string();

        config.layout.base_radius = 0.0;
        assert!(config.validate().is_err());
        config.layout.base_radius = 120.0;

        config.runner.workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig::default();
        config.runner.heap_size_mb = Some(4096);
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.runner, config.runner);
        assert_eq!(parsed.layout, config.layout);
    }

    #[test]
    fn test_partial_file() {
        let parsed: AppConfig = toml::from_str(
            r#"
[runner]
tla2tools_path = "/opt/tla/tla2tools.jar"

[layout]
base_radius = 350.0
"#,
        )
        .unwrap();

        assert_eq!(parsed.runner.tla2tools_path, PathBuf::from("/opt/tla/tla2tools.jar"));
        assert_eq!(parsed.layout.base_radius, 350.0);
        assert_eq!(parsed.logging.format, "pretty");
    }
}
