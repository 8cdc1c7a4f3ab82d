use std::{collections::BTreeMap, path::Path};

use serde_yaml::{Mapping, Value};

use crate::{
    error::{Rejection, Violation},
    identifier::derive_identifier,
    types::{Skill, SkillHeader},
};

/// Minimum length of a skill description, in characters.
pub const MIN_DESCRIPTION_LEN: usize = 20;

/// Validate a skill name: non-empty, lowercase ASCII letters, digits and hyphens.
pub fn validate_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Read a marker file and turn it into a [`Skill`].
///
/// Never fails with anything but a [`Rejection`]; I/O errors are converted
/// into [`Rejection::Read`].
pub async fn parse_skill(marker_path: &Path, base: &Path) -> Result<Skill, Rejection> {
    let content =
        tokio::fs::read_to_string(marker_path)
            .await
            .map_err(|e| Rejection::Read {
                path: marker_path.to_path_buf(),
                message: e.to_string(),
            })?;
    parse_skill_content(&content, marker_path, base)
}

/// Parse already-loaded SKILL.md text found at `marker_path` under `base`.
pub fn parse_skill_content(
    content: &str,
    marker_path: &Path,
    base: &Path,
) -> Result<Skill, Rejection> {
    let header_error = |message: String| Rejection::Header {
        path: marker_path.to_path_buf(),
        message,
    };

    let (header_text, body) = split_frontmatter(content).map_err(header_error)?;
    let mapping = match header_text {
        Some(text) => parse_header(text).map_err(header_error)?,
        None => Mapping::new(),
    };

    let header = validate_header(&mapping).map_err(|violations| Rejection::Schema {
        path: marker_path.to_path_buf(),
        violations,
    })?;

    let directory = marker_path.parent().unwrap_or(marker_path);
    let directory_name = directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if header.name != directory_name {
        return Err(Rejection::IdentityMismatch {
            path: marker_path.to_path_buf(),
            declared: header.name,
            directory: directory_name,
        });
    }

    Ok(Skill {
        identifier: derive_identifier(marker_path, base),
        directory: directory.to_path_buf(),
        marker_path: marker_path.to_path_buf(),
        name: header.name,
        description: header.description,
        license: header.license,
        allowed_tools: header.allowed_tools,
        metadata: header.metadata,
        content: body.trim().to_string(),
    })
}

/// Split SKILL.md content into (header, body).
///
/// The header is present only when the document opens with a `---` line; it
/// runs until the next line that is exactly `---`. Without a header the whole
/// document is the body.
fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), String> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    let Some(after_open) = trimmed.strip_prefix("---") else {
        return Ok((None, content));
    };
    let Some((open_rest, rest)) = after_open.split_once('\n') else {
        return Err("missing closing --- for header".into());
    };
    if !open_rest.trim().is_empty() {
        // `---foo` is body text, not a delimiter.
        return Ok((None, content));
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Ok((Some(&rest[..offset]), &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err("missing closing --- for header".into())
}

/// Parse header text as a YAML mapping. An empty header is an empty mapping.
fn parse_header(text: &str) -> Result<Mapping, String> {
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Mapping(m)) => Ok(m),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err("header must be a mapping of keys to values".into()),
        Err(e) => Err(format!("invalid YAML: {e}")),
    }
}

/// Validate a parsed header against the SKILL.md schema.
///
/// Every violation is collected; unknown keys are ignored.
pub fn validate_header(header: &Mapping) -> Result<SkillHeader, Vec<Violation>> {
    let mut violations = Vec::new();

    let name = required_string(header, "name", &mut violations);
    if let Some(name) = &name {
        if name.is_empty() {
            violations.push(Violation::new("name", "must not be empty"));
        } else if !validate_name(name) {
            violations.push(Violation::new(
                "name",
                format!("must contain only lowercase letters, digits and hyphens, got '{name}'"),
            ));
        }
    }

    let description = required_string(header, "description", &mut violations);
    if let Some(description) = &description {
        let len = description.chars().count();
        if len < MIN_DESCRIPTION_LEN {
            violations.push(Violation::new(
                "description",
                format!("must be at least {MIN_DESCRIPTION_LEN} characters, got {len}"),
            ));
        }
    }

    let license = match present(header, "license") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            violations.push(Violation::new("license", expected("a string", other)));
            None
        },
    };

    let allowed_tools = match present(header, "allowed-tools") {
        None => None,
        Some(Value::Sequence(items)) => {
            let mut tools = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => tools.push(s.clone()),
                    other => violations.push(Violation::new(
                        format!("allowed-tools[{i}]"),
                        expected("a string", other),
                    )),
                }
            }
            Some(tools)
        },
        Some(other) => {
            violations.push(Violation::new(
                "allowed-tools",
                expected("a list of strings", other),
            ));
            None
        },
    };

    let metadata = match present(header, "metadata") {
        None => None,
        Some(Value::Mapping(entries)) => {
            let mut map = BTreeMap::new();
            for (key, value) in entries {
                let Value::String(key) = key else {
                    violations.push(Violation::new("metadata", "keys must be strings"));
                    continue;
                };
                match value {
                    Value::String(v) => {
                        map.insert(key.clone(), v.clone());
                    },
                    other => violations.push(Violation::new(
                        format!("metadata.{key}"),
                        expected("a string", other),
                    )),
                }
            }
            Some(map)
        },
        Some(other) => {
            violations.push(Violation::new(
                "metadata",
                expected("a mapping of strings", other),
            ));
            None
        },
    };

    match (name, description) {
        (Some(name), Some(description)) if violations.is_empty() => Ok(SkillHeader {
            name,
            description,
            license,
            allowed_tools,
            metadata,
        }),
        _ => Err(violations),
    }
}

/// Value for `key`, treating an explicit `null` as absent.
fn present<'a>(header: &'a Mapping, key: &str) -> Option<&'a Value> {
    header.get(key).filter(|v| !v.is_null())
}

fn required_string(
    header: &Mapping,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match present(header, key) {
        None => {
            violations.push(Violation::new(key, "required"));
            None
        },
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            violations.push(Violation::new(key, expected("a string", other)));
            None
        },
    }
}

fn expected(what: &str, got: &Value) -> String {
    let kind = match got {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    };
    format!("expected {what}, got {kind}")
}
