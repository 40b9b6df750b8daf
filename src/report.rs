//! Diagnostics accumulation and the final build report.
//!
//! Stages push their findings into a [`DiagnosticSink`] as they run; the
//! pipeline folds the sink and the per-stage counters into one immutable
//! [`Report`] at the end. Rendering the report as text, and turning it into
//! an exit code, belong to the caller.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Accumulates diagnostics across pipeline stages.
///
/// Each compilation run owns exactly one sink; nothing is shared between
/// runs.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(%message);
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
        });
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message);
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    pub fn num_errors(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn num_warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// The aggregate outcome of one compilation run.
///
/// All counters are final; the report is handed out by value and never
/// updated afterwards.
#[derive(Debug)]
#[non_exhaustive]
pub struct Report {
    pub num_errors: usize,
    pub num_warnings: usize,

    /// Declared symbol counts, reserved symbols excluded.
    pub num_terminals: usize,
    pub num_nonterminals: usize,
    pub num_productions: usize,

    pub num_states: usize,

    pub num_conflicts: usize,
    pub expected_conflicts: usize,

    pub num_unused_terminals: usize,
    pub num_unused_nonterminals: usize,
    pub num_never_reduced: usize,

    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Whether code emission must be skipped.
    pub fn has_blocking_errors(&self) -> bool {
        self.num_errors > 0
    }

    /// Whether more conflicts were recorded than the grammar declared.
    pub fn conflicts_exceed_expectation(&self) -> bool {
        self.num_conflicts > self.expected_conflicts
    }
}
