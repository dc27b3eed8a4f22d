//! The relay loop
//!
//! Polls the message source, forwards records not yet in the ledger, and
//! persists the ledger after each cycle that forwarded something. Runs until
//! SIGINT/SIGTERM or a [`RelayCommand::Shutdown`].

use super::backoff::BackoffPolicy;
use super::panic_message;
use super::signals::ShutdownSignals;
use crate::config::{NotificationConfig, PollingConfig, RelayConfig};
use crate::delivery::{Notifier, TelegramNotifier};
use crate::ledger::ProcessedLedger;
use crate::message::{format_record, MessageRecord};
use crate::source::{MessageSource, TermuxSmsSource};
use crate::telemetry::{startup_message, DeviceSnapshot, TelemetryProvider, TermuxTelemetry};
use crate::update::{update_message, UpdateChecker};
use crate::{RelayError, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Message sent when the relay stops cleanly
pub const SHUTDOWN_MESSAGE: &str = "⚠️ <b>SMS Forwarder stopped</b>";

/// Where the relay is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Starting,
    SteadyPoll,
    BackoffPoll,
    Stopped,
}

/// Commands that can be sent to a running relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// Skip the current wait and poll immediately
    PollNow,

    /// Stop the relay
    Shutdown,
}

/// Summary of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the source
    pub fetched: usize,
    /// Records already in the ledger
    pub skipped: usize,
    /// Records delivered and recorded
    pub forwarded: usize,
    /// Records whose delivery failed; retried next cycle
    pub failed: usize,
    /// Wait before the next cycle
    pub next_delay: Duration,
}

/// What interrupted a wait
enum Wake {
    Elapsed,
    Command(Option<RelayCommand>),
    Signal(&'static str),
}

/// SMS relay
pub struct Relay {
    polling: PollingConfig,
    notifications: NotificationConfig,
    backoff: BackoffPolicy,

    source: Arc<dyn MessageSource>,
    notifier: Arc<dyn Notifier>,
    telemetry: Option<Arc<dyn TelemetryProvider>>,
    update_checker: Option<UpdateChecker>,

    ledger: ProcessedLedger,

    /// Consecutive empty or panicked cycles
    failures: u32,
    state: RelayState,

    command_rx: Option<mpsc::Receiver<RelayCommand>>,
    command_tx: mpsc::Sender<RelayCommand>,
}

impl Relay {
    /// Create a relay with the given collaborators
    ///
    /// Loads the ledger from `config.ledger_path`.
    pub fn new(
        config: &RelayConfig,
        source: Arc<dyn MessageSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(10);

        Self {
            polling: config.polling.clone(),
            notifications: config.notifications.clone(),
            backoff: BackoffPolicy::from_polling(&config.polling),
            source,
            notifier,
            telemetry: None,
            update_checker: None,
            ledger: ProcessedLedger::load(&config.ledger_path),
            failures: 0,
            state: RelayState::Starting,
            command_rx: Some(command_rx),
            command_tx,
        }
    }

    /// Create a relay reading Termux and delivering to Telegram
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let source = Arc::new(TermuxSmsSource::new(config.polling.source_timeout()));
        let notifier = Arc::new(TelegramNotifier::new(&config.telegram)?);

        let mut relay = Self::new(config, source, notifier)
            .with_telemetry(Arc::new(TermuxTelemetry::new()));
        if let Some(url) = &config.notifications.update_check_url {
            relay = relay.with_update_checker(UpdateChecker::new(url.clone())?);
        }
        Ok(relay)
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryProvider>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_update_checker(mut self, checker: UpdateChecker) -> Self {
        self.update_checker = Some(checker);
        self
    }

    /// Mark this relay as a restart
    ///
    /// Restarts skip the startup notification and the update check.
    pub fn as_restart(mut self) -> Self {
        self.notifications.startup = false;
        self.update_checker = None;
        self
    }

    /// Get a command sender for controlling the relay
    pub fn command_sender(&self) -> mpsc::Sender<RelayCommand> {
        self.command_tx.clone()
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn ledger(&self) -> &ProcessedLedger {
        &self.ledger
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// Execute a single poll cycle
    ///
    /// Never fails: an empty listing counts toward backoff, and a record whose
    /// delivery fails stays out of the ledger so the next cycle retries it.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let records = self.source.fetch(self.polling.fetch_limit).await;

        if records.is_empty() {
            self.failures = self.failures.saturating_add(1);
            let next_delay = self.backoff.delay_for(self.failures);

            if self.backoff.is_backing_off(self.failures) {
                self.state = RelayState::BackoffPoll;
                info!(
                    failures = self.failures,
                    "Multiple failures, waiting {} seconds",
                    next_delay.as_secs()
                );
            } else {
                self.state = RelayState::SteadyPoll;
                debug!(failures = self.failures, "Empty poll");
            }

            return CycleReport {
                fetched: 0,
                skipped: 0,
                forwarded: 0,
                failed: 0,
                next_delay,
            };
        }

        self.failures = 0;
        self.state = RelayState::SteadyPoll;

        let mut report = CycleReport {
            fetched: records.len(),
            skipped: 0,
            forwarded: 0,
            failed: 0,
            next_delay: self.polling.poll_interval(),
        };

        for record in &records {
            let id = record.id();
            if self.ledger.contains(&id) {
                report.skipped += 1;
                continue;
            }

            if self.forward(record).await {
                self.ledger.insert(id);
                report.forwarded += 1;
            } else {
                warn!(id = %id, "Delivery failed, will retry next cycle");
                report.failed += 1;
            }
        }

        if report.forwarded > 0 {
            info!(
                forwarded = report.forwarded,
                "Forwarded {} new messages to Telegram",
                report.forwarded
            );
            if let Err(e) = self.ledger.save() {
                error!(error = %e, "Failed to save processed message ledger");
            }
        }

        report
    }

    async fn forward(&self, record: &MessageRecord) -> bool {
        let outcome = self.notifier.deliver(&format_record(record)).await;
        if outcome.success {
            info!(
                sender = record.sender.as_deref().unwrap_or("Unknown"),
                "Forwarded SMS"
            );
        }
        outcome.success
    }

    /// Run exactly one cycle and flush the ledger
    pub async fn run_once(&mut self) -> CycleReport {
        let report = self.run_cycle().await;
        self.flush_ledger();
        self.state = RelayState::Stopped;
        report
    }

    /// Run the relay loop with graceful shutdown on SIGTERM/SIGINT
    pub async fn run(&mut self) -> Result<()> {
        let mut command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| RelayError::Other("Relay already running".to_string()))?;
        let mut signals = ShutdownSignals::install()?;

        self.startup().await;
        self.state = RelayState::SteadyPoll;

        loop {
            // A signal cancels the cycle; commands are handled between cycles
            let cycle = tokio::select! {
                result = AssertUnwindSafe(self.run_cycle()).catch_unwind() => Some(result),
                name = signals.recv() => {
                    info!("Received {}, initiating graceful shutdown", name);
                    None
                }
            };

            let delay = match cycle {
                None => break,
                Some(Ok(report)) => report.next_delay,
                Some(Err(panic)) => {
                    self.failures = self.failures.saturating_add(1);
                    error!(
                        failures = self.failures,
                        "Error in relay loop: {}",
                        panic_message(panic.as_ref())
                    );
                    self.polling.error_retry_delay()
                }
            };

            let wake = tokio::select! {
                _ = tokio::time::sleep(delay) => Wake::Elapsed,
                cmd = command_rx.recv() => Wake::Command(cmd),
                name = signals.recv() => Wake::Signal(name),
            };

            match wake {
                Wake::Elapsed => {}
                Wake::Command(Some(RelayCommand::PollNow)) => {
                    debug!("Received poll command");
                }
                Wake::Command(Some(RelayCommand::Shutdown)) => {
                    info!("Received shutdown command");
                    break;
                }
                Wake::Command(None) => {
                    debug!("Command channel closed");
                    break;
                }
                Wake::Signal(name) => {
                    info!("Received {}, initiating graceful shutdown", name);
                    break;
                }
            }
        }

        info!("Performing shutdown cleanup");
        self.cleanup().await;
        Ok(())
    }

    async fn startup(&mut self) {
        self.state = RelayState::Starting;
        info!(
            ledger_entries = self.ledger.len(),
            "Starting SMS relay to Telegram"
        );

        if self.notifications.startup {
            let snapshot = match &self.telemetry {
                Some(telemetry) => telemetry.snapshot().await,
                None => DeviceSnapshot::new(),
            };
            let message = startup_message(&snapshot, chrono::Local::now());
            if self.notifier.deliver(&message).await.success {
                info!("Startup message sent");
            } else {
                warn!("Failed to send startup message");
            }
        }

        if let Some(checker) = &self.update_checker {
            match checker.check().await {
                Ok(Some(latest)) => {
                    info!(latest = %latest, "Newer version available");
                    self.notifier.deliver(&update_message(&latest)).await;
                }
                Ok(None) => debug!("Running the latest version"),
                Err(e) => warn!(error = %e, "Update check failed"),
            }
        }
    }

    fn flush_ledger(&mut self) {
        if !self.ledger.is_dirty() {
            return;
        }
        if let Err(e) = self.ledger.save() {
            error!(error = %e, "Failed to save processed message ledger");
        }
    }

    /// Perform cleanup before shutdown
    async fn cleanup(&mut self) {
        self.flush_ledger();

        if self.notifications.shutdown {
            self.notifier.deliver(SHUTDOWN_MESSAGE).await;
        }

        self.state = RelayState::Stopped;
        info!(
            ledger_entries = self.ledger.len(),
            "SMS relay stopped"
        );
    }
}
