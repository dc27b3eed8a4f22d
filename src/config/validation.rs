//! Configuration validation
//!
//! Validates relay configuration for correctness:
//! - Telegram credentials are present
//! - Intervals and limits are non-zero
//! - The backoff cap is not below the empty-fetch interval

use super::relay_config::RelayConfig;
use crate::RelayError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a relay configuration
pub fn validate_config(config: &RelayConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.telegram.bot_token.trim().is_empty() {
        errors.push(ValidationError::new(
            "telegram.bot_token",
            "Bot token is required (config file or SMS_RELAY_BOT_TOKEN)",
        ));
    } else if !config.telegram.bot_token.contains(':') {
        errors.push(ValidationError::new(
            "telegram.bot_token",
            "Bot token must look like <bot id>:<secret>",
        ));
    }

    if config.telegram.chat_id.trim().is_empty() {
        errors.push(ValidationError::new(
            "telegram.chat_id",
            "Chat id is required (config file or SMS_RELAY_CHAT_ID)",
        ));
    }

    if !config.telegram.api_base.starts_with("http://")
        && !config.telegram.api_base.starts_with("https://")
    {
        errors.push(ValidationError::new(
            "telegram.api_base",
            format!("Invalid URL '{}'", config.telegram.api_base),
        ));
    }

    let polling = &config.polling;
    let non_zero = [
        ("telegram.request_timeout_secs", config.telegram.request_timeout_secs),
        ("polling.poll_interval_secs", polling.poll_interval_secs),
        ("polling.empty_interval_secs", polling.empty_interval_secs),
        ("polling.backoff_cap_secs", polling.backoff_cap_secs),
        ("polling.source_timeout_secs", polling.source_timeout_secs),
        ("polling.fetch_limit", polling.fetch_limit as u64),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::new(field, "Must be greater than 0"));
        }
    }

    if polling.backoff_cap_secs < polling.empty_interval_secs {
        errors.push(ValidationError::new(
            "polling.backoff_cap_secs",
            format!(
                "Backoff cap ({}s) must not be below the empty-fetch interval ({}s)",
                polling.backoff_cap_secs, polling.empty_interval_secs
            ),
        ));
    }

    if let Some(ref url) = config.notifications.update_check_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ValidationError::new(
                "notifications.update_check_url",
                format!("Invalid URL '{}'", url),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and convert errors to RelayError
pub fn validate_config_result(config: &RelayConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        RelayError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RelayConfig {
        RelayConfig::new().with_credentials("123456:ABC-DEF", "8111")
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let errors = validate_config(&RelayConfig::new()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"telegram.bot_token"));
        assert!(fields.contains(&"telegram.chat_id"));
    }

    #[test]
    fn test_malformed_token() {
        let config = RelayConfig::new().with_credentials("nocolon", "8111");
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("<bot id>:<secret>"));
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = valid_config();
        config.polling.fetch_limit = 0;
        config.polling.poll_interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_cap_below_empty_interval() {
        let mut config = valid_config();
        config.polling.backoff_cap_secs = 5;
        config.polling.empty_interval_secs = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "polling.backoff_cap_secs");
    }

    #[test]
    fn test_validate_config_result_message() {
        let err = validate_config_result(&RelayConfig::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Configuration validation failed"));
        assert!(msg.contains("telegram.chat_id"));
    }
}
