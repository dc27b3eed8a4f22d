//! sms-relay - Forward SMS from an Android device to Telegram
//!
//! Runs inside Termux, polls the inbox through Termux:API, and posts every
//! message it has not forwarded before to a Telegram chat. A plain-text ledger
//! of forwarded message identifiers survives restarts.
//!
//! # Architecture
//!
//! - **config**: YAML configuration and validation
//! - **error**: Crate-level error type
//! - **logging**: tracing subscriber setup
//! - **message**: Message records, identifiers, and notification formatting
//! - **source**: Inbox adapters (Termux:API)
//! - **delivery**: Notifiers (Telegram) with transport fallback
//! - **ledger**: Persistent set of forwarded identifiers
//! - **relay**: Poll loop, backoff, and supervisor
//! - **telemetry**: Device snapshot for the startup notification
//! - **update**: Release feed check

// Core modules
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod message;

// Components
pub mod delivery;
pub mod relay;
pub mod source;
pub mod telemetry;
pub mod update;

// Re-exports
pub use error::{RelayError, Result};
