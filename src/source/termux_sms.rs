//! SMS inbox via Termux:API

use super::{sort_oldest_first, MessageSource, SourceError};
use crate::message::MessageRecord;
use async_trait::async_trait;
use std::time::Duration;
use termux::Termux;
use tracing::{debug, error, info, warn};

/// Reads the device inbox with `termux-sms-list`
#[derive(Debug, Clone)]
pub struct TermuxSmsSource {
    api: Termux,
}

impl TermuxSmsSource {
    /// Source resolving the tool through PATH
    pub fn new(timeout: Duration) -> Self {
        Self::with_api(Termux::default().with_timeout(timeout))
    }

    /// Source backed by a preconfigured wrapper
    pub fn with_api(api: Termux) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Termux {
        &self.api
    }

    /// Verify the tool is installed and SMS access has been granted
    pub async fn preflight(&self) -> crate::Result<()> {
        if !Termux::in_termux() {
            warn!("Not running inside Termux, SMS access will likely fail");
        }
        if !self.api.is_available() {
            return Err(termux::Error::NotInstalled(termux::SMS_LIST.to_string()).into());
        }
        self.api.check_sms_permission().await?;
        info!("Termux:API is installed and SMS permission granted");
        Ok(())
    }

    /// Fetch without collapsing failures
    pub async fn try_fetch(&self, limit: usize) -> Result<Vec<MessageRecord>, SourceError> {
        let messages = self.api.sms_list(limit).await?;
        let mut records: Vec<MessageRecord> =
            messages.into_iter().map(MessageRecord::from).collect();
        sort_oldest_first(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl MessageSource for TermuxSmsSource {
    async fn fetch(&self, limit: usize) -> Vec<MessageRecord> {
        match self.try_fetch(limit).await {
            Ok(records) if records.is_empty() => {
                info!("No SMS messages found or empty response");
                records
            }
            Ok(records) => {
                debug!(count = records.len(), "Retrieved SMS messages");
                records
            }
            Err(e @ SourceError::Timeout(_)) => {
                warn!(error = %e, "Timeout while retrieving SMS");
                Vec::new()
            }
            Err(e @ SourceError::Parse(_)) => {
                error!(error = %e, "Error parsing SMS listing");
                Vec::new()
            }
            Err(e @ SourceError::Unavailable(_)) => {
                error!(error = %e, "Error retrieving SMS");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool_collapses_to_empty() {
        let source = TermuxSmsSource::with_api(Termux::with_bin_dir("/nonexistent/termux/bin"));

        let err = source.try_fetch(10).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));

        assert!(source.fetch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_preflight_reports_missing_tool() {
        let source = TermuxSmsSource::with_api(Termux::with_bin_dir("/nonexistent/termux/bin"));
        let err = source.preflight().await.unwrap_err();
        assert!(matches!(
            err,
            crate::RelayError::Termux(termux::Error::NotInstalled(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_returns_oldest_first() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join(termux::SMS_LIST);
        std::fs::write(
            &tool,
            r#"#!/bin/sh
echo '[{"_id": 2, "number": "+1555", "body": "second", "received": "1700000005000"},
       {"_id": 1, "number": "+1555", "body": "first", "received": 1700000000000}]'
"#,
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let source = TermuxSmsSource::with_api(Termux::with_bin_dir(dir.path()));
        let records = source.fetch(20).await;

        let ids: Vec<String> = records.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
