//! Index journal persisted alongside the payload files
//!
//! Recency is encoded by position: entries are stored least to most recently
//! used, so no tick counters need to survive a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the journal inside the cache directory.
pub const JOURNAL_FILE: &str = "index.json";

/// Extension of payload files; everything else in the directory is ignored
/// when rebuilding the index.
pub const BLOB_EXTENSION: &str = "bin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Journal {
    /// Entries ordered least to most recently used.
    pub entries: Vec<JournalEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JournalEntry {
    pub key: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_round_trip() {
        let journal = Journal {
            entries: vec![JournalEntry {
                key: "ab".repeat(32),
                size: 512,
                created_at: Utc::now(),
            }],
        };

        let json = serde_json::to_string(&journal).unwrap();
        let parsed: Journal = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].size, 512);
        assert_eq!(parsed.entries[0].key, journal.entries[0].key);
    }

    #[test]
    fn test_journal_rejects_malformed_json() {
        assert!(serde_json::from_str::<Journal>("{\"entries\": 7}").is_err());
    }
}
