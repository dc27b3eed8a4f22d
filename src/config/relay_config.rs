//! sms-relay configuration file handling
//!
//! Loads and manages the ~/.config/sms-relay/config.yaml file. The parsed
//! `RelayConfig` is built once at startup and handed explicitly to the relay
//! loop and the delivery client.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Telegram Bot API host
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram endpoint settings
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Recipient chat
    #[serde(default)]
    pub chat_id: String,

    /// API host, overridable for self-hosted Bot API servers
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Timeout for each delivery attempt
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// Tokens end up in logs far too easily
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.bot_token.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("TelegramConfig")
            .field("bot_token", &token)
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl TelegramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Poll cadence and backoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Sleep after a cycle that fetched messages
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Sleep after an empty fetch, before backoff kicks in
    #[serde(default = "default_empty_interval")]
    pub empty_interval_secs: u64,

    /// Backoff grows by this much per consecutive empty fetch
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Backoff never sleeps longer than this
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_secs: u64,

    /// Consecutive empty fetches tolerated before backing off
    #[serde(default = "default_backoff_threshold")]
    pub backoff_threshold: u32,

    /// Sleep after a cycle that failed unexpectedly
    #[serde(default = "default_error_retry_delay")]
    pub error_retry_delay_secs: u64,

    /// Most recent messages requested per cycle
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// Timeout for the SMS listing command
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    15
}

fn default_empty_interval() -> u64 {
    10
}

fn default_backoff_base() -> u64 {
    5
}

fn default_backoff_cap() -> u64 {
    30
}

fn default_backoff_threshold() -> u32 {
    5
}

fn default_error_retry_delay() -> u64 {
    5
}

fn default_fetch_limit() -> usize {
    50
}

fn default_source_timeout() -> u64 {
    10
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            empty_interval_secs: default_empty_interval(),
            backoff_base_secs: default_backoff_base(),
            backoff_cap_secs: default_backoff_cap(),
            backoff_threshold: default_backoff_threshold(),
            error_retry_delay_secs: default_error_retry_delay(),
            fetch_limit: default_fetch_limit(),
            source_timeout_secs: default_source_timeout(),
        }
    }
}

impl PollingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn empty_interval(&self) -> Duration {
        Duration::from_secs(self.empty_interval_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_secs)
    }

    pub fn error_retry_delay(&self) -> Duration {
        Duration::from_secs(self.error_retry_delay_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

/// Restart policy for the relay supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Pause before restarting a failed relay
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,

    /// Restarts allowed before the process gives up
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

fn default_restart_delay() -> u64 {
    30
}

fn default_max_restarts() -> u32 {
    5
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_secs: default_restart_delay(),
            max_restarts: default_max_restarts(),
        }
    }
}

impl SupervisorConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

/// Side notifications sent besides relayed messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Announce startup with a device telemetry snapshot
    #[serde(default = "default_true")]
    pub startup: bool,

    /// Announce a clean shutdown
    #[serde(default = "default_true")]
    pub shutdown: bool,

    /// Endpoint returning the latest release as JSON; no check when unset
    #[serde(default)]
    pub update_check_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            startup: true,
            shutdown: true,
            update_check_url: None,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the daily-rolling log file; stderr only when unset
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: None,
        }
    }
}

/// sms-relay configuration
///
/// Represents the complete ~/.config/sms-relay/config.yaml file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    /// Where forwarded message identifiers are recorded
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_ledger_path() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push("sms-relay");
    path.push("processed_sms.txt");
    path
}

impl RelayConfig {
    /// Create a configuration with defaults and no credentials
    pub fn new() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            polling: PollingConfig::default(),
            ledger_path: default_ledger_path(),
            supervisor: SupervisorConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Set the Telegram credentials
    pub fn with_credentials(mut self, bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        self.telegram.bot_token = bot_token.into();
        self.telegram.chat_id = chat_id.into();
        self
    }

    /// Set the ledger location
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::RelayError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading sms-relay configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            poll_interval_secs = config.polling.poll_interval_secs,
            fetch_limit = config.polling.fetch_limit,
            ledger = %config.ledger_path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving sms-relay configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/sms-relay/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("sms-relay");
        path.push("config.yaml");
        path
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = RelayConfig::new();
        assert_eq!(config.polling.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.polling.backoff_cap(), Duration::from_secs(30));
        assert_eq!(config.polling.backoff_threshold, 5);
        assert_eq!(config.polling.fetch_limit, 50);
        assert_eq!(config.telegram.api_base, DEFAULT_API_BASE);
        assert!(config.notifications.startup);
        assert!(config.ledger_path.ends_with("sms-relay/processed_sms.txt"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
telegram:
  bot_token: "123:abc"
  chat_id: "42"
polling:
  poll_interval_secs: 60
  fetch_limit: 20
"#;
        let config: RelayConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.telegram.chat_id, "42");
        assert_eq!(config.telegram.request_timeout_secs, 10);
        assert_eq!(config.polling.poll_interval_secs, 60);
        assert_eq!(config.polling.fetch_limit, 20);
        assert_eq!(config.polling.backoff_cap_secs, 30);
        assert_eq!(config.supervisor.max_restarts, 5);
        assert!(config.notifications.update_check_url.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let config = RelayConfig::new()
            .with_credentials("123:abc", "42")
            .with_ledger_path("/tmp/ledger.txt");
        config.save(path).unwrap();

        let loaded = RelayConfig::load(path).unwrap();
        assert_eq!(loaded.telegram.bot_token, "123:abc");
        assert_eq!(loaded.ledger_path, PathBuf::from("/tmp/ledger.txt"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RelayConfig::load("/nonexistent/config.yaml");
        assert!(matches!(result, Err(crate::RelayError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RelayConfig::new().with_credentials("123:secret", "42");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_default_path() {
        let path = RelayConfig::default_path();
        assert!(path.ends_with("sms-relay/config.yaml"));
    }
}
