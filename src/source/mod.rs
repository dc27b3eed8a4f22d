//! Message sources
//!
//! A source hands the relay the most recent inbox entries once per cycle.
//! Failures stay inside the source: they are logged and reported to the relay
//! as "no messages this cycle", which the relay's backoff already handles.

mod termux_sms;

pub use termux_sms::TermuxSmsSource;

use crate::message::MessageRecord;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Why a fetch produced nothing
#[derive(Debug, Error)]
pub enum SourceError {
    /// Tool missing, permission missing, or the tool exited with an error
    #[error("message source unavailable: {0}")]
    Unavailable(String),

    #[error("message source timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed message source output: {0}")]
    Parse(String),
}

impl From<termux::Error> for SourceError {
    fn from(err: termux::Error) -> Self {
        use termux::Error;

        match err {
            Error::Timeout { timeout, .. } => SourceError::Timeout(timeout),
            Error::ParseError(msg) => SourceError::Parse(msg),
            Error::Json(e) => SourceError::Parse(e.to_string()),
            Error::NotInstalled(_)
            | Error::PermissionDenied(_)
            | Error::CommandFailed(_)
            | Error::Io(_) => SourceError::Unavailable(err.to_string()),
        }
    }
}

/// Supplier of inbox messages
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Up to `limit` most recent records, oldest first; empty on any failure
    async fn fetch(&self, limit: usize) -> Vec<MessageRecord>;
}

/// Order records by receive time, oldest first
///
/// Records without a numeric timestamp keep their relative order and come
/// first.
pub fn sort_oldest_first(records: &mut [MessageRecord]) {
    records.sort_by_key(MessageRecord::received_at);
}
