//! Bounded recording history

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::options::{OutputFormat, Quality};

/// Maximum number of history entries retained
pub const HISTORY_CAP: usize = 100;

/// One completed recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub quality: Quality,
    pub format: OutputFormat,
}

/// Ordered log of completed recordings, newest appended last
///
/// Bounded: once the cap is reached the oldest entry is evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    cap: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(HISTORY_CAP)
    }
}

impl HistoryLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
        }
    }

    /// Append an entry, evicting the oldest when at capacity
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Remove the entry at `index`, oldest first
    pub fn remove(&mut self, index: usize) -> Option<HistoryEntry> {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of recorded durations across all retained entries
    pub fn total_duration_seconds(&self) -> u64 {
        self.entries.iter().map(|e| e.duration_seconds).sum()
    }
}
