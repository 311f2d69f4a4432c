//! Bounded migration log.
//!
//! Holds the most recent entries of a migration run; once `capacity` is
//! reached the oldest entry is evicted for every new one.

use std::collections::VecDeque;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct MigrationLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl MigrationLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, level: LogLevel, key: Option<&str>, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: chrono::Utc::now().timestamp_millis(),
            level,
            key: key.map(str::to_string),
            message: message.into(),
        });
    }

    /// Oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}
