//! In-memory sending log consumed by the presentation layer
//!
//! Session-lifetime only: nothing survives a restart, and there is no size
//! cap. Entries are stored newest-first so the UI can render them directly.

use chrono::{Local, Utc};
use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_SUFFIX_LEN: usize = 9;
const SENT_MARKER: &str = "Message sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Millisecond timestamp plus a random suffix; unique within a session.
    /// Entries written by one operation share the timestamp prefix.
    pub id: String,
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub struct SendingLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl SendingLog {
    pub fn new() -> Self {
        let seed = LogEntry {
            id: "initial".to_string(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message: "System initialized and ready to send messages".to_string(),
            kind: LogKind::Info,
            details: None,
        };
        Self {
            entries: RwLock::new(vec![seed]),
        }
    }

    /// Prepend a new entry and return a copy of it.
    pub fn add(&self, message: impl Into<String>, kind: LogKind, details: Option<String>) -> LogEntry {
        let entry = LogEntry {
            id: next_id(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
            kind,
            details,
        };
        self.entries.write().insert(0, entry.clone());
        entry
    }

    /// Newest-first snapshot.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Distinct successful send operations, derived from the timestamp
    /// prefix of Success entries mentioning a sent message. Entries that
    /// don't match are simply excluded, never an error.
    pub fn successful_sends(&self) -> usize {
        let entries = self.entries.read();
        let mut operations = std::collections::HashSet::new();
        for entry in entries.iter() {
            if entry.kind == LogKind::Success && entry.message.contains(SENT_MARKER) {
                let prefix = entry.id.split('-').next().unwrap_or(&entry.id);
                operations.insert(prefix.to_string());
            }
        }
        operations.len()
    }
}

impl Default for SendingLog {
    fn default() -> Self {
        Self::new()
    }
}

fn next_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}
