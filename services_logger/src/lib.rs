//! # Logger Service
//!
//! Structured audit trail for the registry workspace.
//!
//! ## Philosophy
//!
//! The runtime and the registry never print; they record. Everything
//! worth knowing — a spawn, a dropped message, a registration, a reap —
//! becomes a typed [`LogEntry`] with a severity, the process it concerns,
//! and key/value fields, appended to a bounded in-memory [`LogBuffer`].
//! Tests assert on the buffer the same way an operator would query it,
//! which keeps the trail honest: if it isn't recorded, it didn't happen.

use core_types::ProcessId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Default number of entries a [`LogBuffer`] retains
const DEFAULT_LOG_CAPACITY: usize = 256;

/// Severity of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Routine traces: deliveries, drops of messages to dead processes
    Debug,
    /// State changes worth keeping: registrations, unregistrations, reaps
    Info,
    /// Requests the registry refused or left unanswered
    Warn,
    /// Defects: encode failures, sends that bounced
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// The process the event concerns, when one is identifiable
    pub source: Option<ProcessId>,
    /// What happened, as a short fixed phrase
    pub message: String,
    /// The specifics, as key/value pairs
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Records an event at an explicit severity
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            source: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Records a routine trace
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    /// Records a state change
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    /// Records a refusal
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    /// Records a defect
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Names the process the event concerns
    pub fn with_source(mut self, source: ProcessId) -> Self {
        self.source = Some(source);
        self
    }

    /// Attaches one specific as a key/value pair
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }
}

/// Bounded in-memory trail of recorded events
///
/// Keeps the most recent entries up to a fixed capacity; the oldest fall
/// off the front. Queries never consume.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    /// Creates a trail with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Creates a trail retaining at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    /// Appends an entry, evicting the oldest if at capacity
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Returns the number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the trail is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Returns entries at exactly the given severity
    pub fn at_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level == level).collect()
    }

    /// Returns the most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<&LogEntry> {
        self.entries.iter().rev().take(limit).collect()
    }

    /// Discards the whole trail
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
