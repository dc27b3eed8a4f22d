//! Relay loop and supervision
//!
//! [`Relay`] polls a [`MessageSource`](crate::source::MessageSource), skips
//! anything already in the ledger, and hands the rest to a
//! [`Notifier`](crate::delivery::Notifier). [`Supervisor`] restarts it after
//! unexpected failures.

mod backoff;
mod engine;
mod signals;
mod supervisor;

pub use backoff::BackoffPolicy;
pub use engine::{CycleReport, Relay, RelayCommand, RelayState, SHUTDOWN_MESSAGE};
pub use supervisor::{error_message, Supervisor};

use std::any::Any;

/// Best-effort text for a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
