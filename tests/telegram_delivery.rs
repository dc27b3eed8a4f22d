use httpmock::prelude::*;
use serde_json::json;
use sms_relay::config::TelegramConfig;
use sms_relay::delivery::{Notifier, TelegramNotifier, TransportStrategy};
use std::time::Duration;

const MARKED_UP: &str = "<b>📱 New SMS</b>\n<b>From:</b> +1555\n<b>Message:</b> a &lt; b";
const PLAIN: &str = "📱 New SMS\nFrom: +1555\nMessage: a < b";

fn notifier_for(base: String) -> TelegramNotifier {
    let config = TelegramConfig {
        bot_token: "123:TOKEN".to_string(),
        chat_id: "42".to_string(),
        api_base: base,
        request_timeout_secs: 1,
    };
    TelegramNotifier::new(&config).unwrap()
}

fn ok_body() -> serde_json::Value {
    json!({"ok": true, "result": {"message_id": 7}})
}

#[tokio::test]
async fn rich_markup_accepted_first() {
    let server = MockServer::start_async().await;
    let rich = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/bot123:TOKEN/sendMessage")
                .json_body(json!({"chat_id": "42", "text": MARKED_UP, "parse_mode": "HTML"}));
            then.status(200).json_body(ok_body());
        })
        .await;

    let notifier = notifier_for(server.url(""));
    let outcome = notifier.deliver(MARKED_UP).await;

    assert!(outcome.success);
    assert_eq!(outcome.strategy, Some(TransportStrategy::RichMarkup));
    rich.assert_async().await;
}

#[tokio::test]
async fn rejected_markup_falls_back_to_plain_json() {
    let server = MockServer::start_async().await;
    let rich = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/bot123:TOKEN/sendMessage")
                .json_body_partial(r#"{"parse_mode": "HTML"}"#);
            then.status(400).json_body(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: can't parse entities"
            }));
        })
        .await;
    let plain = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/bot123:TOKEN/sendMessage")
                .json_body(json!({"chat_id": "42", "text": PLAIN}));
            then.status(200).json_body(ok_body());
        })
        .await;

    let notifier = notifier_for(server.url(""));
    let outcome = notifier.deliver(MARKED_UP).await;

    assert!(outcome.success);
    assert_eq!(outcome.strategy, Some(TransportStrategy::PlainJson));
    rich.assert_hits_async(1).await;
    plain.assert_hits_async(1).await;
}

#[tokio::test]
async fn form_encoding_is_last_resort() {
    let server = MockServer::start_async().await;
    let json_requests = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/bot123:TOKEN/sendMessage")
                .header("content-type", "application/json");
            then.status(500).body("upstream error");
        })
        .await;
    let form = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/bot123:TOKEN/sendMessage")
                .header("content-type", "application/x-www-form-urlencoded")
                .x_www_form_urlencoded_tuple("chat_id", "42")
                .x_www_form_urlencoded_tuple("text", PLAIN);
            then.status(200).json_body(ok_body());
        })
        .await;

    let notifier = notifier_for(server.url(""));
    let outcome = notifier.deliver(MARKED_UP).await;

    assert!(outcome.success);
    assert_eq!(outcome.strategy, Some(TransportStrategy::PlainForm));
    json_requests.assert_hits_async(2).await;
    form.assert_hits_async(1).await;
}

#[tokio::test]
async fn every_strategy_failing_reports_failure() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/bot123:TOKEN/sendMessage");
            then.status(403)
                .json_body(json!({"ok": false, "description": "Forbidden: bot was blocked"}));
        })
        .await;

    let notifier = notifier_for(server.url(""));
    let outcome = notifier.deliver(MARKED_UP).await;

    assert!(!outcome.success);
    assert_eq!(outcome.strategy, None);
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn ok_false_with_200_is_not_success() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/bot123:TOKEN/sendMessage");
            then.status(200).json_body(json!({"ok": false}));
        })
        .await;

    let notifier = notifier_for(server.url(""));
    assert!(!notifier.deliver("hello").await.success);
}

#[tokio::test]
async fn garbled_response_is_not_success() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/bot123:TOKEN/sendMessage");
            then.status(200).body("<html>captive portal</html>");
        })
        .await;

    let notifier = notifier_for(server.url(""));
    assert!(!notifier.deliver("hello").await.success);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/bot123:TOKEN/sendMessage");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(ok_body());
        })
        .await;

    let notifier = notifier_for(server.url("")).with_strategies(vec![TransportStrategy::RichMarkup]);
    let outcome = notifier.deliver("hello").await;
    assert!(!outcome.success);
}

#[tokio::test]
async fn unreachable_endpoint_fails_without_panicking() {
    let notifier = notifier_for("http://127.0.0.1:1".to_string());
    let outcome = notifier.deliver("hello").await;
    assert!(!outcome.success);
}
