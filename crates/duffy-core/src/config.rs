//! Configuration module for Duffy.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Duffy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub link: LinkConfig,
    pub health: HealthConfig,
    pub cache: CacheConfig,
    pub notifications: NotificationsConfig,
    pub mailbox: MailboxConfig,
    pub logging: LoggingConfig,
}

/// Which side of the pairing this device is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    #[default]
    Phone,
    Watch,
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRole::Phone => write!(f, "phone"),
            DeviceRole::Watch => write!(f, "watch"),
        }
    }
}

/// Identity of this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Human-readable device name, used in logs and notifications.
    pub name: String,
    pub role: DeviceRole,
}

/// Paired-device link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// When `false`, every send is dropped as "not supported".
    pub enabled: bool,
    /// Address this device listens on for its counterpart.
    pub listen: String,
    /// Address of the counterpart device.
    pub peer: String,
    /// Milliseconds to wait when dialing the counterpart.
    pub connect_timeout_ms: u64,
    /// Seconds between attempts to flush queued background messages.
    pub retry_interval: u64,
    /// Maximum queued background messages; the oldest is dropped on overflow.
    pub outbox_capacity: usize,
}

/// Health data provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// JSON export of daily step counts (`{"YYYY-MM-DD": steps}`).
    pub source: PathBuf,
    /// Seconds between background refreshes of today's steps.
    pub poll_interval: u64,
}

/// Local cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the SQLite database.
    pub database: PathBuf,
    /// Days of step history kept; older records are pruned at start-up.
    pub retention_days: u32,
}

/// Local notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// When `false` the goal is still tracked but nothing is shown.
    pub enabled: bool,
}

/// Coordinator mailbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Maximum queued events before senders wait.
    pub capacity: usize,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/duffy/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("duffy")
            .join("config.yaml")
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("duffy")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "duffy".to_string(),
            role: DeviceRole::Phone,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: "127.0.0.1:47470".to_string(),
            peer: "127.0.0.1:47471".to_string(),
            connect_timeout_ms: 2000,
            retry_interval: 15,
            outbox_capacity: 64,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            source: data_dir().join("steps.json"),
            poll_interval: 60,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database: data_dir().join("duffy.db"),
            retention_days: 30,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"link.peer"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- device ---
        if self.device.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "device.name".into(),
                message: "must not be empty".into(),
            });
        }

        // --- link ---
        if self.link.enabled {
            if self.link.listen.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError {
                    field: "link.listen".into(),
                    message: format!("not a socket address: '{}'", self.link.listen),
                });
            }
            if self.link.peer.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError {
                    field: "link.peer".into(),
                    message: format!("not a socket address: '{}'", self.link.peer),
                });
            }
            if self.link.listen == self.link.peer {
                errors.push(ValidationError {
                    field: "link.peer".into(),
                    message: "must differ from link.listen".into(),
                });
            }
        }
        if self.link.connect_timeout_ms == 0 {
            errors.push(ValidationError {
                field: "link.connect_timeout_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.link.retry_interval == 0 {
            errors.push(ValidationError {
                field: "link.retry_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.link.outbox_capacity == 0 {
            errors.push(ValidationError {
                field: "link.outbox_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- health ---
        if self.health.poll_interval == 0 {
            errors.push(ValidationError {
                field: "health.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- cache ---
        if self.cache.retention_days < 7 {
            errors.push(ValidationError {
                field: "cache.retention_days".into(),
                message: "must keep at least 7 days (week view)".into(),
            });
        }

        // --- mailbox ---
        if self.mailbox.capacity == 0 {
            errors.push(ValidationError {
                field: "mailbox.capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use duffy_core::config::{ConfigBuilder, DeviceRole};
///
/// let config = ConfigBuilder::new()
///     .device_role(DeviceRole::Watch)
///     .link_listen("127.0.0.1:47471")
///     .link_peer("127.0.0.1:47470")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- device ---

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.config.device.name = name.into();
        self
    }

    pub fn device_role(mut self, role: DeviceRole) -> Self {
        self.config.device.role = role;
        self
    }

    // --- link ---

    pub fn link_enabled(mut self, enabled: bool) -> Self {
        self.config.link.enabled = enabled;
        self
    }

    pub fn link_listen(mut self, addr: impl Into<String>) -> Self {
        self.config.link.listen = addr.into();
        self
    }

    pub fn link_peer(mut self, addr: impl Into<String>) -> Self {
        self.config.link.peer = addr.into();
        self
    }

    pub fn link_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.link.connect_timeout_ms = ms;
        self
    }

    pub fn link_retry_interval(mut self, seconds: u64) -> Self {
        self.config.link.retry_interval = seconds;
        self
    }

    pub fn link_outbox_capacity(mut self, n: usize) -> Self {
        self.config.link.outbox_capacity = n;
        self
    }

    // --- health ---

    pub fn health_source(mut self, path: PathBuf) -> Self {
        self.config.health.source = path;
        self
    }

    pub fn health_poll_interval(mut self, seconds: u64) -> Self {
        self.config.health.poll_interval = seconds;
        self
    }

    // --- cache ---

    pub fn cache_database(mut self, path: PathBuf) -> Self {
        self.config.cache.database = path;
        self
    }

    pub fn cache_retention_days(mut self, days: u32) -> Self {
        self.config.cache.retention_days = days;
        self
    }

    // --- notifications ---

    pub fn notifications_enabled(mut self, enabled: bool) -> Self {
        self.config.notifications.enabled = enabled;
        self
    }

    // --- mailbox ---

    pub fn mailbox_capacity(mut self, n: usize) -> Self {
        self.config.mailbox.capacity = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
