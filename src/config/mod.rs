//! Configuration module for the file server
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. Every field has a default,
//! so an empty document (or no file at all) yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = env_var_pattern();
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

fn env_var_pattern() -> &'static regex_lite::Regex {
    static PATTERN: std::sync::OnceLock<regex_lite::Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}")
            .expect("env var pattern is a valid regex")
    })
}

/// Custom deserializer for strings with environment variable expansion.
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

fn deserialize_path_with_env<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(PathBuf::from(expand_env_vars(&s)))
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Server address cannot be empty".into(),
            ));
        }

        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "Storage root cannot be empty".into(),
            ));
        }

        if self.server.max_concurrent_uploads == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_concurrent_uploads must be greater than zero when set".into(),
            ));
        }

        if self.logging.dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "Log directory cannot be empty".into(),
            ));
        }

        let file_name = self.logging.file_name.trim();
        if file_name.is_empty() || file_name.contains('/') || file_name.contains('\\') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log file name '{}': must be a bare file name",
                self.logging.file_name
            )));
        }

        validate_log_level(&self.logging.level)
    }
}

/// Check a log level name, case-insensitively
///
/// Applies to `logging.level` and to the `--log-level` override alike.
pub fn validate_log_level(level: &str) -> Result<(), ConfigError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(ConfigError::ValidationError(format!(
            "Invalid log level '{}': must be one of trace, debug, info, warn, error",
            other
        ))),
    }
}

/// Which path accepts upload POSTs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadRoute {
    /// `GET /upload` serves the form, `POST /receive` stores the file
    #[default]
    Receive,
    /// `/upload` does both
    Upload,
}

impl UploadRoute {
    /// URL path the upload form posts to
    pub fn path(self) -> &'static str {
        match self {
            UploadRoute::Receive => "/receive",
            UploadRoute::Upload => "/upload",
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address", deserialize_with = "deserialize_with_env")]
    pub address: String,
    #[serde(default)]
    pub upload_route: UploadRoute,
    /// Upper bound on uploads processed at the same time. Unbounded when unset.
    #[serde(default)]
    pub max_concurrent_uploads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            upload_route: UploadRoute::default(),
            max_concurrent_uploads: None,
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:9092".to_string()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory served at `/` and receiving uploads
    #[serde(
        default = "default_storage_root",
        deserialize_with = "deserialize_path_with_env"
    )]
    pub root: PathBuf,
    /// HTML page served at `GET /upload`; a built-in form is used when unset
    #[serde(default)]
    pub upload_form: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            upload_form: None,
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

/// Log file and rotation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir", deserialize_with = "deserialize_path_with_env")]
    pub dir: PathBuf,
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
    /// Size in megabytes after which the log is rotated. 0 disables size rotation.
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    /// Number of rotated files to keep. 0 keeps all of them.
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
    /// Days to keep rotated files. 0 disables age-based removal.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl LoggingConfig {
    /// Full path of the active log file
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file_name: default_log_file_name(),
            max_size_mb: default_max_size_mb(),
            max_backups: default_max_backups(),
            max_age_days: default_max_age_days(),
            level: default_log_level(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_file_name() -> String {
    "fileserver.log".to_string()
}

fn default_max_size_mb() -> u64 {
    5
}

fn default_max_backups() -> usize {
    3
}

fn default_max_age_days() -> u64 {
    28
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    9090
}
