//! Diagnostic sinks for recoverable parsing problems.
//!
//! Parsers never log through global state directly. They report warnings and
//! errors to a [`DiagnosticSink`]; [`TracingSink`] forwards to `tracing`, while
//! [`MemorySink`] keeps the messages so callers and tests can inspect them.

use std::sync::Mutex;
use tracing::{error, warn};

/// Severity of a recorded diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warn,
    Error,
}

/// A message reported by a parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Sink that forwards every diagnostic to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

/// Sink that records diagnostics in memory (and still forwards to `tracing`)
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: Level, message: &str) {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(Diagnostic {
            level,
            message: message.to_string(),
        });
    }

    /// Snapshot of everything recorded so far
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages recorded at the given level
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|record| record.level == level)
            .map(|record| record.message)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn warn(&self, message: &str) {
        warn!("{}", message);
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
        self.push(Level::Error, message);
    }
}
