//! Processed-message ledger
//!
//! The set of message identifiers already forwarded, persisted as a plain text
//! file with one identifier per line. Identifiers are only ever added. A lost
//! or corrupt file means history may be forwarded again, never that a new
//! message is skipped.

use crate::message::MessageId;
use crate::{RelayError, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Persisted set of forwarded message identifiers
#[derive(Debug)]
pub struct ProcessedLedger {
    path: PathBuf,
    ids: HashSet<MessageId>,
    /// Set when in-memory ids have not reached disk
    dirty: bool,
}

impl ProcessedLedger {
    /// Create an empty ledger backed by `path` without reading it
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: HashSet::new(),
            dirty: false,
        }
    }

    /// Load the ledger from `path`
    ///
    /// A missing or unreadable file yields an empty ledger; the failure is
    /// logged, not returned.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No ledger yet, starting empty");
                return Self::empty(path);
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Ledger unreadable, previously forwarded messages may be sent again"
                );
                return Self::empty(path);
            }
        };

        let ids: HashSet<MessageId> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(MessageId::from)
            .collect();

        debug!(path = %path.display(), count = ids.len(), "Loaded ledger");

        Self {
            path,
            ids,
            dirty: false,
        }
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Record an identifier; returns false if it was already present
    pub fn insert(&mut self, id: MessageId) -> bool {
        let inserted = self.ids.insert(id);
        if inserted {
            self.dirty = true;
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether there are identifiers not yet saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist the full set, replacing the file atomically
    ///
    /// The set is written to a temporary file next to the target and renamed
    /// over it, so a concurrent reader sees either the old or the new set.
    pub fn save(&mut self) -> Result<()> {
        self.write_atomic().map_err(|source| RelayError::LedgerPersist {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        debug!(path = %self.path.display(), count = self.ids.len(), "Saved ledger");
        Ok(())
    }

    fn write_atomic(&self) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut sorted: Vec<&MessageId> = self.ids.iter().collect();
        sorted.sort();

        let temp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            for id in sorted {
                writeln!(writer, "{}", id)?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRecord;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::load(dir.path().join("processed_sms.txt"));
        assert!(ledger.is_empty());
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn test_load_ignores_blank_lines_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_sms.txt");
        fs::write(&path, "a1\n\n  b2  \na1\n").unwrap();

        let ledger = ProcessedLedger::load(&path);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&MessageId::from("a1")));
        assert!(ledger.contains(&MessageId::from("b2")));
    }

    #[test]
    fn test_load_unreadable_is_empty() {
        // A directory cannot be read as a file
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::load(dir.path());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_insert_marks_dirty() {
        let mut ledger = ProcessedLedger::empty("unused.txt");
        assert!(ledger.insert(MessageId::from("a1")));
        assert!(ledger.is_dirty());
        assert!(!ledger.insert(MessageId::from("a1")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("processed_sms.txt");

        let mut ledger = ProcessedLedger::load(&path);
        ledger.insert(MessageId::from("b2"));
        ledger.insert(MessageId::from("a1"));
        ledger.save().unwrap();
        assert!(!ledger.is_dirty());

        assert_eq!(fs::read_to_string(&path).unwrap(), "a1\nb2\n");

        let reloaded = ProcessedLedger::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&MessageId::from("a1")));
    }

    #[test]
    fn test_derived_id_with_padded_sender_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_sms.txt");
        let record = MessageRecord::new(" +1555", "hi", "1700000000000");

        let mut ledger = ProcessedLedger::load(&path);
        ledger.insert(record.id());
        ledger.save().unwrap();

        let reloaded = ProcessedLedger::load(&path);
        assert!(reloaded.contains(&record.id()));

        let multiline = MessageRecord::new("\n+1555", "hi", "1700000000000");
        let mut ledger = reloaded;
        ledger.insert(multiline.id());
        ledger.save().unwrap();
        assert!(ProcessedLedger::load(&path).contains(&multiline.id()));
    }

    #[test]
    fn test_save_overwrites_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_sms.txt");
        fs::write(&path, "old\n").unwrap();

        let mut ledger = ProcessedLedger::load(&path);
        ledger.insert(MessageId::from("new"));
        ledger.save().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "new\nold\n");
        // No stray temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_failure_keeps_dirty() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let mut ledger = ProcessedLedger::empty(blocker.join("processed_sms.txt"));
        ledger.insert(MessageId::from("a1"));

        let err = ledger.save().unwrap_err();
        assert!(matches!(err, RelayError::LedgerPersist { .. }));
        assert!(ledger.is_dirty());
    }
}
