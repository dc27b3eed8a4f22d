//! Error types for sms-relay
//!
//! Crate-level error enum for failures that cross module boundaries. Source and
//! delivery failures have their own enums and are absorbed inside their
//! components; what reaches `RelayError` is configuration, persistence, and
//! supervisor failures. Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sms-relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Processed-message ledger could not be written
    #[error("Failed to persist ledger {path}: {source}")]
    LedgerPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Termux:API errors (preflight, telemetry)
    #[error("Termux:API error: {0}")]
    Termux(#[from] termux::Error),

    /// Version check errors
    #[error("Update check failed: {0}")]
    Update(String),

    /// The supervisor gave up restarting the relay
    #[error("Relay stopped after {attempts} failed attempts: {last_error}")]
    RestartsExhausted { attempts: u32, last_error: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}
