//! Tool-name derivation from a marker file's location.

use std::{
    borrow::Cow,
    path::{Component, Path},
};

/// Prefix shared by every derived tool name.
pub const NAMESPACE: &str = "skills_";

/// Derive the tool name for a marker file found under `base`.
///
/// The directories between `base` and the marker file are joined with `_`,
/// hyphens become underscores, and the result is prefixed with [`NAMESPACE`].
/// Only path structure matters; the header's `name` is never consulted.
///
/// A marker directly inside `base` yields the bare namespace, so `base` must
/// never be the skill directory itself. If `base` is not an ancestor of the
/// marker, the marker's full parent path is used. Segments that are not
/// valid UTF-8 are kept, with invalid bytes replaced by U+FFFD.
#[must_use]
pub fn derive_identifier(marker_path: &Path, base: &Path) -> String {
    let relative = marker_path.strip_prefix(base).unwrap_or(marker_path);
    let segments: Vec<Cow<'_, str>> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();

    format!("{NAMESPACE}{}", segments.join("_").replace('-', "_"))
}
