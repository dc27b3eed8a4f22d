//! Termux:API wrapper for Rust
//!
//! A type-safe interface to the `termux-*` command-line tools shipped with the
//! Termux:API package. Every invocation is bounded by a timeout so a hung
//! Android service cannot stall the caller.
//!
//! # Example
//!
//! ```no_run
//! use termux::Termux;
//!
//! # async fn demo() -> termux::Result<()> {
//! let api = Termux::new()?;
//!
//! // Most recent 20 SMS messages
//! let messages = api.sms_list(20).await?;
//! for sms in &messages {
//!     println!("{:?}: {:?}", sms.number, sms.body);
//! }
//!
//! let battery = api.battery_status().await?;
//! println!("Battery: {:?}%", battery.percentage);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Tool that lists SMS messages
pub const SMS_LIST: &str = "termux-sms-list";
/// Tool that reports battery state
pub const BATTERY_STATUS: &str = "termux-battery-status";
/// Tool that reports telephony device information
pub const TELEPHONY_DEVICE_INFO: &str = "termux-telephony-deviceinfo";
/// Tool that reports the current Wi-Fi connection
pub const WIFI_CONNECTION_INFO: &str = "termux-wifi-connectioninfo";

/// Default timeout for a single tool invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when interacting with Termux:API
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is not installed or not in PATH")]
    NotInstalled(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to execute command: {0}")]
    CommandFailed(String),

    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("Failed to parse output: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Termux:API operations
pub type Result<T> = std::result::Result<T, Error>;

/// An SMS message as reported by `termux-sms-list`
///
/// Field types vary between Termux:API releases (`_id` and `received` show up
/// as either strings or numbers), so every field is read leniently: strings and
/// numbers become strings, anything else is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sms {
    #[serde(
        default,
        rename = "_id",
        alias = "id",
        deserialize_with = "lenient_string"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        rename = "threadid",
        alias = "thread_id",
        deserialize_with = "lenient_string"
    )]
    pub thread_id: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, alias = "sender", deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub body: Option<String>,
    /// Epoch milliseconds on most devices, a formatted date on some releases
    #[serde(default, deserialize_with = "lenient_string")]
    pub received: Option<String>,
}

/// Battery state from `termux-battery-status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    pub percentage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub health: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub plugged: Option<String>,
}

/// Telephony details from `termux-telephony-deviceinfo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub network_operator: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub network_operator_name: Option<String>,
}

/// Wi-Fi connection from `termux-wifi-connectioninfo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ssid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub supplicant_state: Option<String>,
}

/// Accept strings, numbers and booleans as text; everything else is `None`
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Output from a Termux:API command that exited successfully
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Get combined stdout and stderr output
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Termux:API CLI wrapper
#[derive(Debug, Clone)]
pub struct Termux {
    /// Directory holding the tools; `None` resolves through PATH
    bin_dir: Option<PathBuf>,
    /// Upper bound for each command
    timeout: Duration,
}

impl Default for Termux {
    fn default() -> Self {
        Self {
            bin_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Termux {
    /// Create a new instance, failing if the SMS tool is missing
    pub fn new() -> Result<Self> {
        let api = Self::default();
        if !api.is_available() {
            return Err(Error::NotInstalled(SMS_LIST.to_string()));
        }
        Ok(api)
    }

    /// Create with tools resolved from a specific directory
    pub fn with_bin_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: Some(path.into()),
            ..Default::default()
        }
    }

    /// Set the per-command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-command timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check if the SMS tool can be found
    pub fn is_available(&self) -> bool {
        self.resolve(SMS_LIST).is_some()
    }

    /// Whether the process runs inside a Termux installation
    pub fn in_termux() -> bool {
        Path::new("/data/data/com.termux").exists()
    }

    // --- SMS ---

    /// List the `limit` most recent SMS messages
    pub async fn sms_list(&self, limit: usize) -> Result<Vec<Sms>> {
        let limit = limit.to_string();
        let output = self.run_command(SMS_LIST, &["-l", &limit]).await?;

        if output.stdout.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&output.stdout).map_err(|e| {
            Error::ParseError(format!("{} (output: {})", e, truncate(&output.stdout, 200)))
        })
    }

    /// Verify that Termux:API has been granted SMS access
    pub async fn check_sms_permission(&self) -> Result<()> {
        let output = self.run_command(SMS_LIST, &["-l", "1"]).await?;
        if is_permission_error(&output.combined()) {
            return Err(Error::PermissionDenied(output.combined().trim().to_string()));
        }
        Ok(())
    }

    // --- Device information ---

    /// Battery level and charging state
    pub async fn battery_status(&self) -> Result<BatteryStatus> {
        self.json_command(BATTERY_STATUS).await
    }

    /// Telephony device information
    pub async fn telephony_device_info(&self) -> Result<DeviceInfo> {
        self.json_command(TELEPHONY_DEVICE_INFO).await
    }

    /// Current Wi-Fi connection
    pub async fn wifi_connection_info(&self) -> Result<WifiInfo> {
        self.json_command(WIFI_CONNECTION_INFO).await
    }

    async fn json_command<T: for<'de> Deserialize<'de>>(&self, program: &str) -> Result<T> {
        let output = self.run_command(program, &[]).await?;
        serde_json::from_str(&output.stdout).map_err(Error::from)
    }

    // --- Internal helpers ---

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        match self.bin_dir {
            Some(ref dir) => {
                let candidate = dir.join(program);
                candidate.is_file().then_some(candidate)
            }
            None => std::env::var_os("PATH").and_then(|paths| {
                std::env::split_paths(&paths)
                    .map(|dir| dir.join(program))
                    .find(|candidate| candidate.is_file())
            }),
        }
    }

    /// Run a tool and return its output
    async fn run_command(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let path = self
            .resolve(program)
            .ok_or_else(|| Error::NotInstalled(program.to_string()))?;

        let mut cmd = Command::new(&path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::NotInstalled(program.to_string()),
                _ => Error::Io(e),
            })?,
            Err(_) => {
                return Err(Error::Timeout {
                    command: program.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            if is_permission_error(&stderr) {
                return Err(Error::PermissionDenied(stderr.trim().to_string()));
            }
            let detail = if stderr.trim().is_empty() {
                format!("{} exited with {}", program, output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::CommandFailed(detail));
        }

        Ok(CommandOutput {
            stdout,
            stderr,
        })
    }
}

fn is_permission_error(text: &str) -> bool {
    text.contains("Permission denied") || text.contains("permission denied")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
