//! Configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/scope.toml` (or an explicit path)
//! 2. Environment variables prefixed with `SCOPE_`, which win over the file
//!
//! ```text
//! SCOPE_RESOURCE="TCPIP0::192.168.1.100::INSTR"
//! SCOPE_MODEL=maui
//! SCOPE_WRITE_INTERVAL_MS=50
//! ```
//!
//! Every field except `resource` has a default.

use crate::error::{ScopeError, ScopeResult};
use crate::instrument::ScopeModel;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/scope.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Connection and runtime settings for one oscilloscope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// VISA resource string, e.g. `TCPIP0::192.168.1.100::INSTR`.
    #[serde(default)]
    pub resource: String,
    /// Instrument family.
    #[serde(default)]
    pub model: ScopeModel,
    /// VISA open timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Minimum delay between two commands in milliseconds.
    #[serde(default = "default_write_interval_ms")]
    pub write_interval_ms: u64,
    /// Terminator appended to every command.
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_write_interval_ms() -> u64 {
    10
}

fn default_line_terminator() -> String {
    "\n".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            resource: String::new(),
            model: ScopeModel::default(),
            timeout_ms: default_timeout_ms(),
            write_interval_ms: default_write_interval_ms(),
            line_terminator: default_line_terminator(),
            log_level: default_log_level(),
        }
    }
}

impl ScopeConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> ScopeResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path` and the environment. A missing file is not an error;
    /// the result is still validated.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ScopeResult<Self> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Layered sources (defaults, file, environment) without extraction, so
    /// callers can merge further overrides such as command-line flags.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(ScopeConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SCOPE_"))
    }

    /// Check the loaded values.
    pub fn validate(&self) -> ScopeResult<()> {
        if self.resource.trim().is_empty() {
            return Err(ScopeError::Configuration(
                "'resource' cannot be empty".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ScopeError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ScopeError::Configuration(
                "'timeout_ms' must be greater than 0".to_string(),
            ));
        }
        if self.line_terminator.is_empty() {
            return Err(ScopeError::Configuration(
                "'line_terminator' cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_from_file_with_defaults() {
        let file = write_config(
            r#"
            resource = "TCPIP0::192.168.1.100::INSTR"
            model = "hdo6xxx"
            "#,
        );
        let config = ScopeConfig::load_from(file.path()).unwrap();
        assert_eq!(config.resource, "TCPIP0::192.168.1.100::INSTR");
        assert_eq!(config.model, ScopeModel::Hdo6xxx);
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.write_interval_ms, 10);
        assert_eq!(config.line_terminator, "\n");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let file = write_config(
            r#"
            resource = "GPIB0::1::INSTR"
            write_interval_ms = 10
            "#,
        );
        std::env::set_var("SCOPE_WRITE_INTERVAL_MS", "250");
        std::env::set_var("SCOPE_MODEL", "maui");
        let config = ScopeConfig::load_from(file.path());
        std::env::remove_var("SCOPE_WRITE_INTERVAL_MS");
        std::env::remove_var("SCOPE_MODEL");

        let config = config.unwrap();
        assert_eq!(config.write_interval_ms, 250);
        assert_eq!(config.model, ScopeModel::Maui);
    }

    #[test]
    #[serial]
    fn test_missing_resource_is_rejected() {
        let file = write_config("model = \"t3dso1204\"\n");
        let err = ScopeConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ScopeError::Configuration(_)));
    }

    #[test]
    fn test_invalid_log_level() {
        let config = ScopeConfig {
            resource: "GPIB0::1::INSTR".into(),
            log_level: "verbose".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    #[serial]
    fn test_unknown_model_fails_to_load() {
        let file = write_config(
            r#"
            resource = "GPIB0::1::INSTR"
            model = "tds2024"
            "#,
        );
        let err = ScopeConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ScopeError::Config(_)));
    }
}
