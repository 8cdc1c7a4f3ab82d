use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::SkillhostConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "skillhost.toml",
    "skillhost.yaml",
    "skillhost.yml",
    "skillhost.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<SkillhostConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `<cwd>/skillhost.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/skillhost/skillhost.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SkillhostConfig::default()` if no config file is found or the
/// file found cannot be loaded.
pub fn discover_and_load(cwd: &Path) -> SkillhostConfig {
    if let Some(path) = find_config_file(cwd, config_dir().as_deref()) {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    SkillhostConfig::default()
}

/// Find the first config file in `cwd`, then in `user_dir`.
fn find_config_file(cwd: &Path, user_dir: Option<&Path>) -> Option<PathBuf> {
    std::iter::once(cwd)
        .chain(user_dir)
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

/// Returns the user-global config directory (`~/.config/skillhost/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "skillhost").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SkillhostConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
