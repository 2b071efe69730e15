//! Diagnostics reporting.
//!
//! Legacy (non-`try_*`) operations never return errors; instead every failure
//! they swallow is reported to a [`DiagnosticsSink`]. The default sink,
//! [`TracingSink`], forwards entries to `tracing`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::CollectionError;

/// Severity of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational message.
    Info,
    /// An error reported without an underlying failure.
    Error,
    /// A caught failure; the entry carries its detail.
    Exception,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Exception => "exception",
        };
        f.write_str(tag)
    }
}

/// One diagnostic entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// When the entry was produced.
    pub timestamp: DateTime<Utc>,
    /// How serious it is.
    pub severity: Severity,
    /// Type name of the collection that produced it.
    pub origin: String,
    /// Human-readable message.
    pub message: String,
    /// Error detail for [`Severity::Exception`] entries.
    pub detail: Option<String>,
}

impl Diagnostic {
    /// Creates an entry stamped with the current time.
    pub fn new(severity: Severity, origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            origin: origin.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Creates an exception entry for a caught error.
    pub fn exception(origin: impl Into<String>, operation: &str, error: &CollectionError) -> Self {
        Self {
            detail: Some(format!("{error:?}")),
            ..Self::new(
                Severity::Exception,
                origin,
                format!("{operation}: {error}"),
            )
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.severity,
            self.origin,
            self.message
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// Receives diagnostic entries.
pub trait DiagnosticsSink: Send + Sync {
    /// Records one entry.
    fn record(&self, diagnostic: Diagnostic);
}

/// Shared, dynamically-dispatched sink.
pub type DynSink = Arc<dyn DiagnosticsSink>;

/// Sink that emits every entry as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::info!(
                origin = %diagnostic.origin,
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::warn!(
                origin = %diagnostic.origin,
                "{}",
                diagnostic.message
            ),
            Severity::Exception => tracing::error!(
                origin = %diagnostic.origin,
                detail = diagnostic.detail.as_deref().unwrap_or_default(),
                "{}",
                diagnostic.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_entry() {
        let err = CollectionError::EngineUnavailable {
            message: "ping failed".to_string(),
        };
        let entry = Diagnostic::exception("app::Users", "insert", &err);
        assert_eq!(entry.severity, Severity::Exception);
        assert_eq!(
            entry.message,
            "insert: search engine unavailable: ping failed"
        );
        assert!(entry.detail.unwrap().contains("EngineUnavailable"));
    }

    #[test]
    fn test_display_format() {
        let entry = Diagnostic::new(Severity::Info, "app::Users", "index created");
        let line = entry.to_string();
        assert!(line.ends_with("[info] app::Users: index created"));
    }
}
