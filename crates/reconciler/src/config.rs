//! Configuration loading and validation for the reconciler.

use crate::engine::EngineSettings;
use instance::ReadSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

// Re-export Validate trait for derive macro
#[allow(unused_imports)]
use validator::Validate as _;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub zabbix: ZabbixSettings,

    #[serde(default)]
    pub instances: InstanceSettings,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.zabbix.validate()?;
        self.instances.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Monitoring backend endpoint and credentials
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ZabbixSettings {
    #[validate(length(min = 1), custom = "validate_api_url")]
    pub api_url: String,

    #[validate(length(min = 1))]
    pub username: String,

    pub password: String,

    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

/// Filesystem layout of instance directories
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InstanceSettings {
    #[validate(length(min = 1))]
    pub root_dir: String,

    #[validate(length(min = 1))]
    pub dir_prefix: String,

    #[validate(length(min = 1))]
    pub config_filename: String,

    #[validate(length(min = 1))]
    pub port_key: String,

    #[validate(length(min = 1))]
    pub port_separator: String,

    #[validate(range(min = 1, max = 20))]
    pub poll_attempts: u32,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_poll_delay")]
    pub poll_delay: Duration,
}

/// Reconciliation behavior
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_scan_interval")]
    pub scan_interval: Duration,

    pub diff_mode: DiffMode,

    pub failure_policy: FailurePolicy,

    /// Host name to register checks under; local host name when unset.
    pub host_name: Option<String>,
}

/// Which diffing strategy a pass uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffMode {
    /// Added and removed sets computed independently, both always applied.
    Symmetric,

    /// Legacy gate: only one direction per pass, chosen by comparing set
    /// sizes; nothing happens when the sizes match.
    Cardinality,
}

/// What a convergence failure does to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log, leave the instance in its prior state, retry next pass.
    Resilient,

    /// Abort the process on the first failure.
    FailFast,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations. Values mirror the constants the original
// deployment ran with.

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for ZabbixSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost/api_jsonrpc.php".to_string(),
            username: "admin".to_string(),
            password: "password".to_string(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            root_dir: "/data/game".to_string(),
            dir_prefix: "game".to_string(),
            config_filename: "configuration.property".to_string(),
            port_key: "port".to_string(),
            port_separator: "=".to_string(),
            poll_attempts: 6,
            poll_delay: Duration::from_secs(10),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
            diff_mode: DiffMode::Symmetric,
            failure_policy: FailurePolicy::Resilient,
            host_name: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: None,
            format: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zabbix: ZabbixSettings::default(),
            instances: InstanceSettings::default(),
            engine: EngineConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// Custom validators

fn validate_api_url(url: &str) -> Result<(), ValidationError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::new("api_url_not_http"));
    }
    Ok(())
}

fn validate_poll_delay(delay: &Duration) -> Result<(), ValidationError> {
    let secs = delay.as_secs();
    if secs < 1 || secs > 60 {
        return Err(ValidationError::new("poll_delay_out_of_range"));
    }
    Ok(())
}

fn validate_scan_interval(interval: &Duration) -> Result<(), ValidationError> {
    let secs = interval.as_secs();
    if secs < 5 || secs > 600 {
        return Err(ValidationError::new("scan_interval_out_of_range"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/instance-reconciler/config.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./instance-reconciler.yaml"));

        paths
            .into_iter()
            .find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/instance-reconciler/config.yaml"))
    }

    /// Per-instance config read settings
    pub fn read_settings(&self) -> ReadSettings {
        ReadSettings {
            filename: self.instances.config_filename.clone(),
            port_key: self.instances.port_key.clone(),
            separator: self.instances.port_separator.clone(),
            poll_attempts: self.instances.poll_attempts,
            poll_delay: self.instances.poll_delay,
        }
    }

    /// Convert to the engine's settings, with the host name resolved by
    /// the caller.
    pub fn to_engine_settings(&self, host_name: String) -> EngineSettings {
        EngineSettings {
            root_dir: PathBuf::from(&self.instances.root_dir),
            dir_prefix: self.instances.dir_prefix.clone(),
            read: self.read_settings(),
            host_name,
            diff_mode: self.engine.diff_mode,
            failure_policy: self.engine.failure_policy,
        }
    }
}
