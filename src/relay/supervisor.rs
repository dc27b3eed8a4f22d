//! Restart loop around the relay
//!
//! Each attempt builds a fresh relay and runs it in its own task, so a panic
//! that escapes the relay is contained by the task boundary.

use super::engine::Relay;
use super::panic_message;
use super::signals::ShutdownSignals;
use crate::config::SupervisorConfig;
use crate::delivery::Notifier;
use crate::message::format::escape_html;
use crate::source::TermuxSmsSource;
use crate::{RelayError, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Notification text for a relay failure
pub fn error_message(error: &str) -> String {
    format!("⚠️ <b>Error in SMS forwarder:</b> {}", escape_html(error))
}

/// Runs relays until one stops cleanly or restarts run out
pub struct Supervisor {
    config: SupervisorConfig,
    notifier: Arc<dyn Notifier>,
}

impl Supervisor {
    /// `notifier` receives the error notifications sent before each restart
    pub fn new(config: SupervisorConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    /// Check SMS access before the first attempt
    ///
    /// A failure is reported to the chat once and returned. There is no
    /// restart after it.
    pub async fn preflight(&self, source: &TermuxSmsSource) -> Result<()> {
        if let Err(e) = source.preflight().await {
            error!("Failed permission check: {}", e);
            if !self.notifier.deliver(&error_message(&e.to_string())).await.success {
                warn!("Failed to send error notification");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Build and run relays until a clean stop
    ///
    /// `factory` receives the zero-based attempt number. Only the first
    /// attempt sends a startup notification.
    pub async fn supervise<F>(&self, mut factory: F) -> Result<()>
    where
        F: FnMut(u32) -> Result<Relay>,
    {
        let mut restarts: u32 = 0;

        loop {
            let failure = match factory(restarts) {
                Ok(relay) => {
                    let mut relay = if restarts > 0 { relay.as_restart() } else { relay };
                    let handle = tokio::spawn(async move { relay.run().await });

                    match handle.await {
                        Ok(Ok(())) => {
                            info!(restarts, "Relay stopped cleanly");
                            return Ok(());
                        }
                        Ok(Err(e)) => e.to_string(),
                        Err(join_error) if join_error.is_panic() => {
                            format!("panic: {}", panic_message(join_error.into_panic().as_ref()))
                        }
                        Err(join_error) => join_error.to_string(),
                    }
                }
                Err(e) => e.to_string(),
            };

            error!(attempt = restarts + 1, "Unexpected error: {}", failure);
            if !self.notifier.deliver(&error_message(&failure)).await.success {
                warn!("Failed to send error notification");
            }

            if restarts >= self.config.max_restarts {
                return Err(RelayError::RestartsExhausted {
                    attempts: restarts + 1,
                    last_error: failure,
                });
            }
            restarts += 1;

            let delay = self.config.restart_delay();
            info!(
                restart = restarts,
                max_restarts = self.config.max_restarts,
                "Restarting relay in {} seconds",
                delay.as_secs()
            );

            // Relay signal handlers are gone between attempts
            let mut signals = ShutdownSignals::install()?;
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                name = signals.recv() => {
                    info!("Received {} while waiting to restart", name);
                    return Ok(());
                }
            }
        }
    }
}
