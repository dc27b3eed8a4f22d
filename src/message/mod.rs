//! Message model and formatting
//!
//! - **record**: `MessageRecord` (one inbox entry) and `MessageId` derivation
//! - **format**: pure record → notification text rendering

pub mod format;
mod record;

pub use format::{format_record, format_record_with_tz};
pub use record::{MessageId, MessageRecord};
