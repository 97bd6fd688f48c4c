//! Injected diagnostics observer
//!
//! The engine reports what it is doing through a capability handed in at
//! construction instead of a process-wide logger, so embedders (and tests)
//! can capture or redirect engine events. The default implementation forwards
//! to `tracing`.

use std::fmt;

/// Severity of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for DiagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagLevel::Debug => "debug",
            DiagLevel::Info => "info",
            DiagLevel::Warn => "warn",
            DiagLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Observer for engine events.
///
/// Implementations must be cheap to call from the producer thread's hot loop.
pub trait Diagnostics: Send + Sync {
    /// Record one event with structured key/value fields.
    fn record(&self, level: DiagLevel, message: &str, fields: &[(&str, String)]);
}

/// Default observer: forwards every event to the `tracing` macros.
#[derive(Debug, Default, Clone)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, level: DiagLevel, message: &str, fields: &[(&str, String)]) {
        match level {
            DiagLevel::Debug => tracing::debug!(?fields, "{message}"),
            DiagLevel::Info => tracing::info!(?fields, "{message}"),
            DiagLevel::Warn => tracing::warn!(?fields, "{message}"),
            DiagLevel::Error => tracing::error!(?fields, "{message}"),
        }
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&self, _level: DiagLevel, _message: &str, _fields: &[(&str, String)]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(DiagLevel::Warn.to_string(), "warn");
        assert_eq!(DiagLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_null_diagnostics_accepts_events() {
        let diag = NullDiagnostics;
        diag.record(DiagLevel::Error, "ignored", &[("key", "value".to_string())]);
    }
}
