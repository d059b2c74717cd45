//! Compose history sink.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::compose::request::ComposedRequest;

/// Append-only record of composed requests.
pub trait HistorySink: Send + Sync {
    fn record(&self, request: ComposedRequest);
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NoHistory;

impl HistorySink for NoHistory {
    fn record(&self, _request: ComposedRequest) {}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch.
    pub date: u64,
    #[serde(flatten)]
    pub request: ComposedRequest,
}

/// Bounded in-memory history; the oldest entry is evicted when full.
#[derive(Debug)]
pub struct MemoryHistory {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Entries oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

impl HistorySink for MemoryHistory {
    fn record(&self, request: ComposedRequest) {
        if self.capacity == 0 {
            return;
        }
        let date = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(HistoryEntry { date, request });
    }
}
