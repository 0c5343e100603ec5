//! Logging side-channel for pipeline components.
//!
//! Components never depend on a concrete logging backend, only on the
//! narrow `LogSink` emit contract. The embedding application decides where
//! messages go.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "DEBUG"),
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Trait for receiving log messages from pipeline components.
pub trait LogSink: Send + Sync {
    /// Emits a single log message.
    fn emit(&self, severity: Severity, message: &str);
}

/// Shared handle to a log sink.
pub type Logger = Arc<dyn LogSink>;

/// Log sink that writes to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn emit(&self, severity: Severity, message: &str) {
        eprintln!("[voicekit {}] {}", severity, message);
    }
}

/// Log sink that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _severity: Severity, _message: &str) {}
}

/// Log sink that collects messages in memory. Intended for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all collected entries.
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns true if any entry at the given severity contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(s, m)| *s == severity && m.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn emit(&self, severity: Severity, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((severity, message.to_string()));
        }
    }
}

/// Default logger used when the caller does not supply one.
pub fn stderr_logger() -> Logger {
    Arc::new(StderrSink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Debug.to_string(), "DEBUG");
        assert_eq!(Severity::Info.to_string(), "INFO");
        assert_eq!(Severity::Warning.to_string(), "WARN");
        assert_eq!(Severity::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.emit(Severity::Info, "engine loaded");
        sink.emit(Severity::Error, "device not found");

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (Severity::Info, "engine loaded".to_string()));
        assert!(sink.contains(Severity::Error, "device"));
        assert!(!sink.contains(Severity::Info, "device"));
    }

    #[test]
    fn test_null_sink_discards() {
        let sink = NullSink;
        // Just ensure it doesn't panic
        sink.emit(Severity::Error, "ignored");
    }

    #[test]
    fn test_stderr_sink_does_not_panic() {
        let sink = StderrSink;
        sink.emit(Severity::Warning, "test message");
    }

    #[test]
    fn test_sink_as_trait_object() {
        let logger: Logger = Arc::new(MemorySink::new());
        logger.emit(Severity::Info, "via trait object");
    }
}
