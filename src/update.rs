//! Self-update check
//!
//! Fetches a small JSON document describing the latest release and reports
//! whether it is newer than the running build. Never installs anything.

use crate::message::format::escape_html;
use crate::{RelayError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::debug;

/// Version of the running binary
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    version: Option<String>,
    /// GitHub release documents use `tag_name`
    #[serde(default)]
    tag_name: Option<String>,
}

/// Checks a release feed for newer versions
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    client: Client,
    url: String,
    current: String,
}

impl UpdateChecker {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(CHECK_TIMEOUT)
            .user_agent(concat!("sms-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            current: CURRENT_VERSION.to_string(),
        })
    }

    /// Compare against a version other than the running one
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current = version.into();
        self
    }

    /// Latest published version, if newer than the current one
    pub async fn check(&self) -> Result<Option<String>> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::Update(format!(
                "release feed returned HTTP {}",
                response.status()
            )));
        }

        let info: ReleaseInfo = response.json().await?;
        let latest = info
            .version
            .or(info.tag_name)
            .ok_or_else(|| RelayError::Update("release feed has no version".to_string()))?;

        debug!(current = %self.current, latest = %latest, "Checked for updates");
        if compare_versions(&latest, &self.current) == Ordering::Greater {
            Ok(Some(latest))
        } else {
            Ok(None)
        }
    }
}

/// Compare dotted numeric versions, ignoring a leading `v`
///
/// Missing components count as zero and non-numeric suffixes within a
/// component are ignored, so `1.2` equals `1.2.0` and `1.3.0-rc1` equals `1.3.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = parse_version(a);
    let b = parse_version(b);
    let len = a.len().max(b.len());

    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn parse_version(version: &str) -> Vec<u64> {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);

    version
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

/// Notification text announcing a newer version
pub fn update_message(latest: &str) -> String {
    format!(
        "<b>⬆️ Update available</b>\nRunning {}, latest is {}",
        CURRENT_VERSION,
        escape_html(latest)
    )
}
