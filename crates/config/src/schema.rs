/// Config schema types.
use serde::{Deserialize, Serialize};

/// Root of `skillhost.{toml,yaml,json}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillhostConfig {
    pub skills: SkillsConfig,
}

/// Skills discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Whether the skills system is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Extra directories to search for skills, highest priority last.
    /// Relative entries are resolved against the working directory.
    #[serde(default)]
    pub search_paths: Vec<String>,
    /// Search the user-global skills directories.
    #[serde(default = "default_true")]
    pub include_user: bool,
    /// Search `<cwd>/.skillhost/skills`.
    #[serde(default = "default_true")]
    pub include_project: bool,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_paths: Vec::new(),
            include_user: true,
            include_project: true,
        }
    }
}

fn default_true() -> bool {
    true
}
