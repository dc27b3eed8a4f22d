//! Notification delivery
//!
//! The relay hands formatted text to a [`Notifier`] and gets back a single
//! success flag. Behind it, [`TelegramNotifier`] walks an ordered list of
//! [`TransportStrategy`] values, downgrading from rich markup to plain text
//! when the endpoint refuses a request.

pub mod chain;
pub mod markup;
mod telegram;

pub use markup::strip_markup;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// One way of asking the endpoint to post a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportStrategy {
    /// JSON request, text parsed as HTML
    RichMarkup,
    /// JSON request, tags stripped, no parse mode
    PlainJson,
    /// Form-encoded request, tags stripped
    PlainForm,
}

impl TransportStrategy {
    /// Default fallback order
    pub const CHAIN: [TransportStrategy; 3] = [
        TransportStrategy::RichMarkup,
        TransportStrategy::PlainJson,
        TransportStrategy::PlainForm,
    ];

    /// Whether the strategy sends the text with markup removed
    pub fn is_plain(&self) -> bool {
        !matches!(self, TransportStrategy::RichMarkup)
    }
}

impl fmt::Display for TransportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStrategy::RichMarkup => write!(f, "rich_markup"),
            TransportStrategy::PlainJson => write!(f, "plain_json"),
            TransportStrategy::PlainForm => write!(f, "plain_form"),
        }
    }
}

/// Result of one `deliver` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub success: bool,
    /// Strategy that got the message through
    pub strategy: Option<TransportStrategy>,
}

impl DeliveryOutcome {
    pub fn delivered(strategy: TransportStrategy) -> Self {
        Self {
            success: true,
            strategy: Some(strategy),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            strategy: None,
        }
    }
}

/// Why a single strategy attempt failed
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Connection failure, timeout, or unreadable response
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered but did not accept the message
    #[error("rejected with HTTP {status}: {reason}")]
    Rejected { status: u16, reason: String },
}

/// Sink for formatted notifications
///
/// Implementations never fail the caller: every error is reduced to
/// `success = false` and logged.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, text: &str) -> DeliveryOutcome;
}
