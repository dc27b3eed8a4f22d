//! Configuration system
//!
//! Loads ~/.config/sms-relay/config.yaml with support for:
//! - Telegram credentials and endpoint
//! - Poll cadence, fetch window and backoff
//! - Ledger location
//! - Supervisor restart policy
//! - Startup/shutdown/update notifications
//! - Log output

mod relay_config;
pub mod validation;

pub use relay_config::{
    LoggingConfig, NotificationConfig, PollingConfig, RelayConfig, SupervisorConfig,
    TelegramConfig, DEFAULT_API_BASE,
};
pub use validation::{validate_config, validate_config_result, ValidationError};
