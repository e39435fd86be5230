//! Diagnostic sink used by the screening pipeline
//!
//! Screening components never reach for a global logger. They are handed a
//! [`DiagnosticSink`] so tests can observe what was reported.

use std::fmt;
use std::sync::Arc;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Receiver for diagnostics emitted by screening components
pub trait DiagnosticSink: Send + Sync {
    /// Record a message at the given severity
    fn emit(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Severity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    fn critical(&self, message: &str) {
        self.emit(Severity::Critical, message);
    }
}

/// Shared handle to a sink
pub type Diagnostics = Arc<dyn DiagnosticSink>;

/// Sink that forwards to `tracing`
///
/// `tracing` has no critical level; critical diagnostics are emitted at
/// error level with `severity = "critical"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    /// Shared handle for wiring into components
    pub fn shared() -> Diagnostics {
        Arc::new(Self)
    }
}

impl DiagnosticSink for TracingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Warn => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
            Severity::Critical => tracing::error!(severity = "critical", "{message}"),
        }
    }
}
