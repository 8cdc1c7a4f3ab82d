use std::{fmt, path::PathBuf};

/// Errors surfaced to the direct caller of the skills API.
///
/// Everything that can go wrong while walking or parsing is turned into a
/// [`Rejection`] or a diagnostic instead; only malformed arguments end up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("base directory must be an absolute path: {}", .0.display())]
    RelativeBaseDir(PathBuf),

    #[error("path escapes skill directory: {0}")]
    PathEscape(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single schema violation in a SKILL.md header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Header key the violation applies to, e.g. `description` or `metadata.owner`.
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Why a single marker file did not produce a skill.
///
/// Rejections are values: the parser returns them and the discoverer reports
/// them, but neither aborts the discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("malformed header in {}: {message}", path.display())]
    Header { path: PathBuf, message: String },

    #[error("invalid header in {}: {}", path.display(), join_violations(violations))]
    Schema {
        path: PathBuf,
        violations: Vec<Violation>,
    },

    #[error(
        "skill name '{declared}' does not match directory name '{directory}' in {}",
        path.display()
    )]
    IdentityMismatch {
        path: PathBuf,
        declared: String,
        directory: String,
    },
}

impl Rejection {
    /// Marker file the rejection applies to.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Read { path, .. }
            | Self::Header { path, .. }
            | Self::Schema { path, .. }
            | Self::IdentityMismatch { path, .. } => path,
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
