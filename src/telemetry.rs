//! Device telemetry for the startup notification
//!
//! Each probe runs independently; a probe that fails or times out renders as
//! "Unknown" instead of failing the snapshot.

use crate::message::format::{escape_html, TIME_FORMAT};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use std::time::Duration;
use termux::Termux;
use tracing::debug;

/// Timeout applied to each telemetry probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder for a value that could not be read
pub const UNKNOWN: &str = "Unknown";

/// Ordered label/value pairs describing the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSnapshot {
    entries: Vec<(String, String)>,
}

impl DeviceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, rendering a missing value as "Unknown"
    pub fn push(&mut self, label: impl Into<String>, value: Option<String>) {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        self.entries.push((label.into(), value));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Produces a device snapshot
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    async fn snapshot(&self) -> DeviceSnapshot;
}

/// Telemetry read from Termux:API tools
#[derive(Debug, Clone)]
pub struct TermuxTelemetry {
    api: Termux,
}

impl Default for TermuxTelemetry {
    fn default() -> Self {
        Self::with_api(Termux::default().with_timeout(PROBE_TIMEOUT))
    }
}

impl TermuxTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api(api: Termux) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TelemetryProvider for TermuxTelemetry {
    async fn snapshot(&self) -> DeviceSnapshot {
        let (battery, device, wifi) = tokio::join!(
            self.api.battery_status(),
            self.api.telephony_device_info(),
            self.api.wifi_connection_info(),
        );

        let mut snapshot = DeviceSnapshot::new();

        match battery {
            Ok(b) => snapshot.push(
                "Battery",
                Some(format!(
                    "{}% - {}",
                    b.percentage.as_deref().unwrap_or(UNKNOWN),
                    b.status.as_deref().unwrap_or(UNKNOWN)
                )),
            ),
            Err(e) => {
                debug!(error = %e, "Battery probe failed");
                snapshot.push("Battery", None);
            }
        }

        let device = device
            .map_err(|e| debug!(error = %e, "Telephony probe failed"))
            .unwrap_or_default();
        snapshot.push("Device Id", device.device_id);
        snapshot.push("Phone Type", device.phone_type);
        snapshot.push(
            "Network Operator",
            device.network_operator_name.or(device.network_operator),
        );

        let wifi = wifi
            .map_err(|e| debug!(error = %e, "Wi-Fi probe failed"))
            .unwrap_or_default();
        snapshot.push("Wifi", wifi.ssid);
        snapshot.push("Ip", wifi.ip);

        snapshot.push("Host", host_name());
        snapshot
    }
}

fn host_name() -> Option<String> {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
}

/// Build the HTML startup notification
pub fn startup_message<Tz>(snapshot: &DeviceSnapshot, now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut message = String::from("<b>🚀 SMS Forwarder Started</b>\n\n<b>Device Information:</b>\n");

    if snapshot.is_empty() {
        message.push_str("Could not retrieve device information\n");
    }
    for (label, value) in snapshot.entries() {
        message.push_str(&format!(
            "<b>{}:</b> {}\n",
            escape_html(label),
            escape_html(value)
        ));
    }

    message.push_str(&format!(
        "\n<b>Start Time:</b> {}",
        now.format(TIME_FORMAT)
    ));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_push_renders_unknown() {
        let mut snapshot = DeviceSnapshot::new();
        snapshot.push("Battery", None);
        snapshot.push("Wifi", Some("  ".to_string()));
        snapshot.push("Ip", Some("192.168.1.5".to_string()));

        assert_eq!(snapshot.get("Battery"), Some(UNKNOWN));
        assert_eq!(snapshot.get("Wifi"), Some(UNKNOWN));
        assert_eq!(snapshot.get("Ip"), Some("192.168.1.5"));
        assert_eq!(snapshot.get("Missing"), None);
    }

    #[test]
    fn test_startup_message_layout() {
        let mut snapshot = DeviceSnapshot::new();
        snapshot.push("Battery", Some("87% - DISCHARGING".to_string()));
        snapshot.push("Wifi", Some("Home <5G>".to_string()));

        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let message = startup_message(&snapshot, now);

        assert_eq!(
            message,
            "<b>🚀 SMS Forwarder Started</b>\n\n\
             <b>Device Information:</b>\n\
             <b>Battery:</b> 87% - DISCHARGING\n\
             <b>Wifi:</b> Home &lt;5G&gt;\n\
             \n<b>Start Time:</b> 2023-11-14 22:13:20"
        );
    }

    #[test]
    fn test_startup_message_without_entries() {
        let now = Utc.timestamp_opt(0, 0).unwrap();
        let message = startup_message(&DeviceSnapshot::new(), now);
        assert!(message.contains("Could not retrieve device information"));
    }

    #[tokio::test]
    async fn test_missing_tools_render_unknown() {
        let telemetry = TermuxTelemetry::with_api(
            Termux::with_bin_dir("/nonexistent/termux/bin").with_timeout(PROBE_TIMEOUT),
        );
        let snapshot = telemetry.snapshot().await;

        assert_eq!(snapshot.get("Battery"), Some(UNKNOWN));
        assert_eq!(snapshot.get("Device Id"), Some(UNKNOWN));
        assert_eq!(snapshot.get("Wifi"), Some(UNKNOWN));
        assert!(snapshot.get("Host").is_some());
    }
}
