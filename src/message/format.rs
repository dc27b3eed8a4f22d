//! Notification text for relayed messages
//!
//! Output uses the Telegram HTML subset (`<b>` only). User-supplied text is
//! escaped so it can never be parsed as markup.

use super::MessageRecord;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;

/// Rendered when the sender is missing
pub const UNKNOWN_SENDER: &str = "Unknown";
/// Rendered when the body is missing
pub const NO_CONTENT: &str = "No content";
/// Rendered when the receive time is missing
pub const UNKNOWN_TIME: &str = "Unknown time";
/// Timestamp layout in notifications
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a record for delivery, rendering times in the device's zone
pub fn format_record(record: &MessageRecord) -> String {
    format_record_with_tz(record, &Local)
}

/// Format a record for delivery, rendering times in `tz`
pub fn format_record_with_tz<Tz>(record: &MessageRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let sender = record.sender.as_deref().unwrap_or(UNKNOWN_SENDER);
    let body = record.body.as_deref().unwrap_or(NO_CONTENT);
    let time = format_timestamp(record.received.as_deref(), tz);

    format!(
        "<b>📱 New SMS</b>\n\
         <b>From:</b> {}\n\
         <b>Time:</b> {}\n\
         <b>Message:</b> {}",
        escape_html(sender),
        escape_html(&time),
        escape_html(body)
    )
}

/// Render a raw receive time
///
/// Numeric values are epoch milliseconds; anything else is shown unchanged.
pub fn format_timestamp<Tz>(raw: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(raw) = raw else {
        return UNKNOWN_TIME.to_string();
    };

    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|utc| utc.with_timezone(tz).format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Escape the characters Telegram's HTML parser treats specially
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_full_record() {
        let record = MessageRecord::new("+1555", "hi", "1700000000000");
        let text = format_record_with_tz(&record, &Utc);
        assert_eq!(
            text,
            "<b>📱 New SMS</b>\n\
             <b>From:</b> +1555\n\
             <b>Time:</b> 2023-11-14 22:13:20\n\
             <b>Message:</b> hi"
        );
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let text = format_record_with_tz(&MessageRecord::default(), &Utc);
        assert!(text.contains("<b>From:</b> Unknown\n"));
        assert!(text.contains("<b>Time:</b> Unknown time\n"));
        assert!(text.ends_with("<b>Message:</b> No content"));
    }

    #[test]
    fn test_non_numeric_time_rendered_raw() {
        let record = MessageRecord::new("Bank", "ok", "2024-03-01 09:15:00");
        let text = format_record_with_tz(&record, &Utc);
        assert!(text.contains("<b>Time:</b> 2024-03-01 09:15:00\n"));
    }

    #[test]
    fn test_user_content_is_escaped() {
        let record = MessageRecord::new("<script>", "a < b && c > d", "1700000000000");
        let text = format_record_with_tz(&record, &Utc);
        assert!(text.contains("&lt;script&gt;"));
        assert!(text.contains("a &lt; b &amp;&amp; c &gt; d"));
    }

    #[test]
    fn test_format_uses_local_zone() {
        // Only the shape is zone-independent
        let record = MessageRecord::new("+1555", "hi", "1700000000000");
        let text = format_record(&record);
        let time_line = text.lines().nth(2).unwrap();
        let time = time_line.trim_start_matches("<b>Time:</b> ");
        assert_eq!(time.len(), "2023-11-14 22:13:20".len());
    }

    #[test]
    fn test_out_of_range_time_rendered_raw() {
        let raw = i64::MAX.to_string();
        assert_eq!(format_timestamp(Some(&raw), &Utc), raw);
    }
}
