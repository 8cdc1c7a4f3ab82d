//! Configuration loading and skills search-path assembly.
//!
//! Config files: `skillhost.toml`, `skillhost.yaml`, or `skillhost.json`
//! Searched in the working directory, then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod paths;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    paths::{SKILLS_PATH_ENV, SearchEnv, search_paths, search_paths_with},
    schema::{SkillhostConfig, SkillsConfig},
};
