//! Process termination signals

use crate::{RelayError, Result};

/// Listens for SIGTERM/SIGINT (Ctrl-C elsewhere)
pub(crate) struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    pub(crate) fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = signal(SignalKind::terminate()).map_err(|e| {
            RelayError::Other(format!("Failed to set up SIGTERM handler: {}", e))
        })?;
        let sigint = signal(SignalKind::interrupt()).map_err(|e| {
            RelayError::Other(format!("Failed to set up SIGINT handler: {}", e))
        })?;
        Ok(Self { sigterm, sigint })
    }

    #[cfg(not(unix))]
    pub(crate) fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next signal and return its name
    #[cfg(unix)]
    pub(crate) async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }

    #[cfg(not(unix))]
    pub(crate) async fn recv(&mut self) -> &'static str {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}
