//! Diagnostic sink for long-running operations.
//!
//! The walker reports every decision it makes through a [`Diagnostics`]
//! implementation instead of logging directly, so callers decide where the
//! messages go and tests can observe them.
//!
//! Three levels exist:
//!
//! - `debug`: a traversal decision (descend, match, skip)
//! - `error`: a recoverable failure; the operation keeps going
//! - `fatal`: a failure that aborts the operation
//!
//! Reporting a fatal error never terminates the process. The operation
//! returns an error right after reporting it, and the caller decides whether
//! to exit.

use std::error::Error;

/// Receiver for diagnostics emitted during traversal.
pub trait Diagnostics {
    /// A decision worth knowing about when debugging.
    fn debug(&mut self, message: &str);

    /// A failure local to one unit of work. The operation continues.
    fn error(&mut self, error: &dyn Error, message: &str);

    /// A failure that aborts the whole operation.
    fn fatal(&mut self, error: &dyn Error, message: &str);
}

/// Forwards diagnostics to `tracing`.
///
/// Fatal diagnostics are emitted at `ERROR` level with `fatal = true` so a
/// subscriber can tell them apart from recoverable errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn debug(&mut self, message: &str) {
        tracing::debug!("{message}");
    }

    fn error(&mut self, error: &dyn Error, message: &str) {
        tracing::error!(%error, "{message}");
    }

    fn fatal(&mut self, error: &dyn Error, message: &str) {
        tracing::error!(%error, fatal = true, "{message}");
    }
}

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Error,
    Fatal,
}

/// A diagnostic captured by [`RecordingDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub message: String,
}

/// Keeps every diagnostic in memory.
///
/// Useful in tests and for callers that want to present diagnostics
/// themselves after the operation finishes.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub records: Vec<Record>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.as_str())
            .collect()
    }

    fn push(&mut self, level: Level, message: String) {
        self.records.push(Record { level, message });
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn debug(&mut self, message: &str) {
        self.push(Level::Debug, message.to_string());
    }

    fn error(&mut self, error: &dyn Error, message: &str) {
        self.push(Level::Error, format!("{message}: {error}"));
    }

    fn fatal(&mut self, error: &dyn Error, message: &str) {
        self.push(Level::Fatal, format!("{message}: {error}"));
    }
}
