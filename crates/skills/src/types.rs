use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use serde::Serialize;

use crate::error::{Error, Result};

/// File whose presence marks a directory as a skill.
pub const MARKER_FILENAME: &str = "SKILL.md";

// ── Header ───────────────────────────────────────────────────────────────────

/// Validated SKILL.md header.
///
/// Produced once by [`crate::parse::validate_header`]; nothing downstream
/// re-inspects the raw YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillHeader {
    /// Lowercase ASCII letters, digits and hyphens; non-empty.
    pub name: String,
    /// At least [`crate::parse::MIN_DESCRIPTION_LEN`] characters.
    pub description: String,
    pub license: Option<String>,
    /// `allowed-tools`, carried through verbatim. Not enforced here.
    pub allowed_tools: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, String>>,
}

// ── Skill ────────────────────────────────────────────────────────────────────

/// A discovered, fully validated skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub name: String,
    /// Tool name the skill is registered under, derived from its path.
    pub identifier: String,
    /// Directory containing the marker file, as seen through any symlinks.
    pub directory: PathBuf,
    pub marker_path: PathBuf,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Markdown body with the header removed, trimmed.
    pub content: String,
}

impl Skill {
    /// Description attached to the skill's tool at registration time.
    #[must_use]
    pub fn tool_description(&self) -> &str {
        &self.description
    }

    /// Resolve a supporting file relative to the skill directory.
    ///
    /// Absolute paths and `..` components are refused so callers cannot be
    /// pointed outside the skill.
    pub fn supporting_file(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let relative = relative.as_ref();
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(Error::PathEscape(relative.display().to_string()));
        }
        Ok(self.directory.join(relative))
    }
}

// ── Discovery result ─────────────────────────────────────────────────────────

/// A tool name produced by more than one skill in a single pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub identifier: String,
    /// Marker files that produced the identifier, in discovery order.
    pub markers: Vec<PathBuf>,
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Accepted skills in discovery order.
    pub skills: Vec<Skill>,
    /// Duplicate tool names. Advisory; every colliding skill stays in `skills`.
    pub collisions: Vec<Collision>,
    /// Base directories that did not exist.
    pub missing: Vec<PathBuf>,
    /// Number of marker files that were rejected.
    pub rejected: usize,
}

impl Discovery {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
