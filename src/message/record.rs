//! Message records and identifiers
//!
//! `MessageRecord` is the read-only view of one inbox entry for a poll cycle.
//! `MessageId` names a message for deduplication and is what the ledger
//! stores.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex digits of the body digest kept in a derived identifier
const BODY_DIGEST_LEN: usize = 16;

/// One message read from the device inbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Provider-assigned identifier, when the provider reports one
    pub identifier: Option<String>,
    pub sender: Option<String>,
    pub body: Option<String>,
    /// Raw receive time; epoch milliseconds when numeric
    pub received: Option<String>,
}

impl MessageRecord {
    /// Create a record without a provider identifier
    pub fn new(
        sender: impl Into<String>,
        body: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        Self {
            identifier: None,
            sender: Some(sender.into()),
            body: Some(body.into()),
            received: Some(received.into()),
        }
    }

    /// Attach a provider identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Receive time in epoch milliseconds, if the raw value is numeric
    pub fn received_at(&self) -> Option<i64> {
        self.received.as_deref()?.trim().parse().ok()
    }

    /// Deduplication identifier for this record
    pub fn id(&self) -> MessageId {
        MessageId::derive(self)
    }
}

impl From<termux::Sms> for MessageRecord {
    fn from(sms: termux::Sms) -> Self {
        Self {
            identifier: sms.id,
            sender: sms.number,
            body: sms.body,
            received: sms.received,
        }
    }
}

/// Identifier under which a message is recorded as forwarded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an identifier in the form the ledger stores it
    ///
    /// Line breaks become spaces and surrounding whitespace is trimmed, so an
    /// id reads back from the ledger file exactly as it was written.
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        let id = if id.contains(['\n', '\r']) {
            id.replace(['\n', '\r'], " ")
        } else {
            id
        };
        let trimmed = id.trim();
        if trimmed.len() == id.len() {
            Self(id)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Derive the identifier for a record
    ///
    /// The provider identifier is used verbatim when present. Otherwise the id
    /// is the composite `sender-received-digest`, where `digest` is the first 16
    /// hex digits of SHA-256 over the body. Two messages from the same sender
    /// with the same timestamp and body collide; the at-least-once contract
    /// tolerates that.
    pub fn derive(record: &MessageRecord) -> Self {
        if let Some(id) = record
            .identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            return Self::new(id);
        }

        let digest = Sha256::digest(record.body.as_deref().unwrap_or_default().as_bytes());
        let digest = format!("{:x}", digest);

        Self::new(format!(
            "{}-{}-{}",
            record.sender.as_deref().unwrap_or_default(),
            record.received.as_deref().unwrap_or_default(),
            &digest[..BODY_DIGEST_LEN]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_identifier_used_verbatim() {
        let record = MessageRecord::new("+1555", "hi", "1700000000000").with_identifier("a1");
        assert_eq!(record.id().as_str(), "a1");
    }

    #[test]
    fn test_blank_identifier_falls_back_to_derived() {
        let record = MessageRecord::new("+1555", "hi", "1700000000000").with_identifier("  ");
        assert!(record.id().as_str().starts_with("+1555-1700000000000-"));
    }

    #[test]
    fn test_derived_identifier_is_stable() {
        let first = MessageRecord::new("+1555", "hello there", "1700000000000");
        let second = MessageRecord::new("+1555", "hello there", "1700000000000");
        assert_eq!(first.id(), second.id());
        assert_eq!(first.id(), MessageId::derive(&first));
    }

    #[test]
    fn test_derived_identifier_distinguishes_bodies() {
        let first = MessageRecord::new("+1555", "code 1234", "1700000000000");
        let second = MessageRecord::new("+1555", "code 5678", "1700000000000");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_derived_identifier_shape() {
        let record = MessageRecord::new("+1555", "hi", "1700000000000");
        let id = record.id();
        let digest = id.as_str().rsplit('-').next().unwrap();
        assert_eq!(digest.len(), BODY_DIGEST_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_derive_with_missing_fields() {
        let record = MessageRecord::default();
        let id = record.id();
        assert!(id.as_str().starts_with("--"));
    }

    #[test]
    fn test_line_breaks_flattened() {
        let id = MessageId::new("a\nb\r");
        assert_eq!(id.as_str(), "a b");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let record = MessageRecord::new(" +1555", "hi", "1700000000000");
        let id = record.id();
        assert!(id.as_str().starts_with("+1555-1700000000000-"));
        assert_eq!(MessageId::new("\n+1555-1-x "), MessageId::new("+1555-1-x"));
    }

    #[test]
    fn test_received_at() {
        let record = MessageRecord::new("x", "y", " 1700000000000 ");
        assert_eq!(record.received_at(), Some(1_700_000_000_000));

        let record = MessageRecord::new("x", "y", "2024-01-01 10:00");
        assert_eq!(record.received_at(), None);

        assert_eq!(MessageRecord::default().received_at(), None);
    }

    #[test]
    fn test_from_sms() {
        let sms = termux::Sms {
            id: Some("7".to_string()),
            number: Some("+1555".to_string()),
            body: Some("hi".to_string()),
            received: Some("1700000000000".to_string()),
            ..Default::default()
        };
        let record = MessageRecord::from(sms);
        assert_eq!(record.identifier.as_deref(), Some("7"));
        assert_eq!(record.sender.as_deref(), Some("+1555"));
        assert_eq!(record.received_at(), Some(1_700_000_000_000));
    }
}
