//! Operator-facing diagnostics emitted during discovery.
//!
//! The discoverer never writes to a fixed output stream. It reports through a
//! [`DiagnosticSink`] supplied by the embedder; [`TracingSink`] forwards to
//! `tracing` and [`MemorySink`] collects everything for inspection.

use std::{
    fmt,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use tracing::{error, info, warn};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// None of the base directories existed.
    NoBaseDirectories,
    /// A filesystem error below a base directory; that branch was skipped.
    Traversal,
    /// A marker file was rejected.
    Rejected,
    /// Two or more skills derived the same tool name.
    DuplicateIdentifier,
    /// End-of-pass summary.
    Discovered,
}

impl DiagnosticKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoBaseDirectories => "no-base-directories",
            Self::Traversal => "traversal",
            Self::Rejected => "rejected",
            Self::DuplicateIdentifier => "duplicate-identifier",
            Self::Discovered => "discovered",
        }
    }
}

/// A single diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// File or directory the diagnostic refers to, when there is one.
    pub path: Option<PathBuf>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            path: None,
            message: message.into(),
        }
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            kind,
            path: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

/// Receives diagnostics from the discoverer.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Default sink: forwards diagnostics to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, d: Diagnostic) {
        let path = d.path.as_ref().map(|p| p.display().to_string());
        let path = path.as_deref();
        let kind = d.kind.as_str();
        match d.severity {
            Severity::Error => error!(kind, path, "{}", d.message),
            Severity::Warning => warn!(kind, path, "{}", d.message),
            Severity::Info => info!(kind, path, "{}", d.message),
        }
    }
}

/// Sink that keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Diagnostics of one kind, in emission order.
    #[must_use]
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.kind == kind)
            .collect()
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
