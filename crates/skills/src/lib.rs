//! Skills discovery: walking base directories, parsing and validating
//! `SKILL.md` files, and deriving the tool name each skill is exposed under.
//!
//! Skills are directories containing a `SKILL.md` file with YAML frontmatter
//! and markdown instructions. Discovery is a single pass per process; nothing
//! is cached between passes.

pub mod diagnostics;
pub mod discover;
pub mod error;
pub mod identifier;
pub mod parse;
pub mod registry;
pub mod types;

pub use {
    diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, MemorySink, Severity, TracingSink},
    discover::{FsSkillDiscoverer, SkillDiscoverer},
    error::{Error, Rejection, Result, Violation},
    identifier::derive_identifier,
    registry::InMemoryRegistry,
    types::{Collision, Discovery, MARKER_FILENAME, Skill, SkillHeader},
};
