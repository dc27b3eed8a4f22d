//! Telegram Bot API delivery
//!
//! Posts to `{api_base}/bot{token}/sendMessage`. A message counts as delivered
//! only on HTTP 200 with `"ok": true` in the JSON body.

use super::chain::first_success;
use super::{strip_markup, DeliveryError, DeliveryOutcome, Notifier, TransportStrategy};
use crate::config::TelegramConfig;
use crate::Result;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longest response excerpt kept in a rejection reason
const MAX_REASON_LEN: usize = 200;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram client that falls back through transport strategies
pub struct TelegramNotifier {
    client: Client,
    /// Contains the bot token; never log it
    send_url: String,
    chat_id: String,
    strategies: Vec<TransportStrategy>,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    /// Create a notifier from the Telegram settings
    ///
    /// Every request is bounded by `request_timeout_secs`.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static(concat!(
                        "sms-relay/",
                        env!("CARGO_PKG_VERSION")
                    )),
                );
                headers
            })
            .build()?;

        let send_url = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self {
            client,
            send_url,
            chat_id: config.chat_id.clone(),
            strategies: TransportStrategy::CHAIN.to_vec(),
        })
    }

    /// Replace the fallback order
    pub fn with_strategies(mut self, strategies: Vec<TransportStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn strategies(&self) -> &[TransportStrategy] {
        &self.strategies
    }

    /// Send `text` using one strategy
    pub async fn attempt(
        &self,
        strategy: TransportStrategy,
        text: &str,
    ) -> std::result::Result<(), DeliveryError> {
        let plain;
        let text = if strategy.is_plain() {
            plain = strip_markup(text);
            plain.as_str()
        } else {
            text
        };

        let request = self.client.post(&self.send_url);
        let request = match strategy {
            TransportStrategy::RichMarkup => request.json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
                parse_mode: Some("HTML"),
            }),
            TransportStrategy::PlainJson => request.json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
                parse_mode: None,
            }),
            TransportStrategy::PlainForm => {
                request.form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            }
        };

        // reqwest errors embed the URL, which embeds the token
        let response = request.send().await.map_err(|e| e.without_url())?;
        let status = response.status();
        let body = response.text().await.map_err(|e| e.without_url())?;

        debug!(strategy = %strategy, status = status.as_u16(), "Telegram responded");
        check_response(status, &body)
    }
}

/// Decide whether a response means the message was accepted
fn check_response(status: StatusCode, body: &str) -> std::result::Result<(), DeliveryError> {
    let parsed: Option<ApiResponse> = serde_json::from_str(body).ok();

    match parsed {
        Some(ApiResponse { ok: true, .. }) if status == StatusCode::OK => Ok(()),
        Some(ApiResponse {
            description: Some(description),
            ..
        }) => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            reason: description,
        }),
        Some(_) => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            reason: "request not accepted".to_string(),
        }),
        None if body.trim().is_empty() => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            reason: "empty response body".to_string(),
        }),
        None => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            reason: format!("unreadable response body: {}", excerpt(body)),
        }),
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(MAX_REASON_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, text: &str) -> DeliveryOutcome {
        let succeeded = first_success(&self.strategies, "telegram.send_message", |strategy| {
            self.attempt(strategy, text)
        })
        .await;

        match succeeded {
            Some(strategy) => DeliveryOutcome::delivered(strategy),
            None => DeliveryOutcome::failed(),
        }
    }
}
