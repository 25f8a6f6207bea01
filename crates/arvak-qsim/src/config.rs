//! Configuration for the simulator control layer.
//!
//! Supports loading configuration from:
//! 1. A YAML file (default `~/.arvak/qsim.yaml`)
//! 2. Environment variables (with `ARVAK_QSIM_` prefix)
//!
//! Environment variables override file values, which override defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete control layer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QsimConfig {
    /// Registry limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Numerical backend selection
    #[serde(default)]
    pub backend: BackendSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limits enforced by the registry before the backend is asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of live simulator instances
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,

    /// Maximum number of live qubits per instance
    #[serde(default = "default_max_qubits")]
    pub max_qubits_per_instance: usize,
}

/// Which numerical backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Dense statevector simulation.
    #[default]
    Statevector,
    /// Record invocations without simulating.
    Trace,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "statevector" | "sv" => Ok(BackendKind::Statevector),
            "trace" | "recording" => Ok(BackendKind::Trace),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown backend kind: {other}"
            ))),
        }
    }
}

/// Backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Backend kind
    #[serde(default)]
    pub kind: BackendKind,

    /// Qubit capacity of the statevector backend (memory grows as 2^n)
    #[serde(default = "default_max_qubits")]
    pub max_qubits: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: console or json
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_max_instances() -> usize {
    64
}

fn default_max_qubits() -> usize {
    24
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_instances: default_max_instances(),
            max_qubits_per_instance: default_max_qubits(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            max_qubits: default_max_qubits(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl QsimConfig {
    /// Default configuration file location (`~/.arvak/qsim.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".arvak").join("qsim.yaml"))
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: QsimConfig = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::IoError(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Load configuration with the following precedence:
    /// 1. Explicit file if provided, else the default file if it exists
    /// 2. Environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(path)?,
                _ => QsimConfig::default(),
            },
        };

        let config = config.merge_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognized keys: `ARVAK_QSIM_MAX_INSTANCES`, `ARVAK_QSIM_MAX_QUBITS`,
    /// `ARVAK_QSIM_BACKEND`, `ARVAK_QSIM_LOG_LEVEL`, `ARVAK_QSIM_LOG_FORMAT`.
    /// Absent keys leave the current value unchanged; unparsable numbers are
    /// an error.
    pub fn merge_env_with(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("ARVAK_QSIM_MAX_INSTANCES") {
            self.limits.max_instances = parse_count("ARVAK_QSIM_MAX_INSTANCES", &v)?;
        }
        if let Some(v) = lookup("ARVAK_QSIM_MAX_QUBITS") {
            let max = parse_count("ARVAK_QSIM_MAX_QUBITS", &v)?;
            self.limits.max_qubits_per_instance = max;
            self.backend.max_qubits = max;
        }
        if let Some(v) = lookup("ARVAK_QSIM_BACKEND") {
            self.backend.kind = v.parse()?;
        }
        if let Some(v) = lookup("ARVAK_QSIM_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("ARVAK_QSIM_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_instances == 0 {
            return Err(ConfigError::ValidationError(
                "max_instances must be greater than 0".to_string(),
            ));
        }
        if self.limits.max_qubits_per_instance == 0 {
            return Err(ConfigError::ValidationError(
                "max_qubits_per_instance must be greater than 0".to_string(),
            ));
        }
        // 2^n amplitudes must stay addressable.
        if self.backend.max_qubits == 0 || self.backend.max_qubits >= usize::BITS as usize - 4 {
            return Err(ConfigError::ValidationError(format!(
                "backend max_qubits out of range: {}",
                self.backend.max_qubits
            )));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ParseError(format!("{key}: expected a count, got '{value}'")))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
