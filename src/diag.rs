//! Injected diagnostic sink.
//!
//! The enricher never logs to a fixed destination; it emits through a
//! [`DiagnosticSink`] the caller supplies. [`LogSink`] (the default) forwards
//! to the `log` facade, [`MemorySink`] captures entries for tests and
//! measurement.

use std::sync::Mutex;

use log::Level;

/// Destination for the stage's diagnostic messages.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, level: Level, message: &str);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, level: Level, message: &str) {
        log::log!(level, "{message}");
    }
}

/// Captures diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured entries, oldest first.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All captured messages at the given level.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}
