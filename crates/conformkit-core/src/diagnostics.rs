//! Structured parser diagnostics.
//!
//! The parser returns an ordered stream of diagnostics alongside the
//! document instead of writing to a process-wide logger; entries are also
//! mirrored to `tracing` for ambient observability.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recoverable; processing continued.
    Warning,
    /// Fatal; the run was aborted.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One entry in the ordered diagnostic stream produced while parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based source line number.
    pub line_no: usize,
    /// Entry severity.
    pub severity: Severity,
    /// Human-readable description of the problem.
    pub message: String,
    /// Raw text of the offending line.
    pub text: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {}: {} (text: '{}')",
            self.line_no, self.severity, self.message, self.text
        )
    }
}
