//! Skills base-directory assembly.
//!
//! The discoverer only needs an ordered list of absolute paths; this module
//! decides what goes in it. Lowest priority comes first:
//!
//! 1. `<config_dir>/skills` (user-global)
//! 2. `~/.skillhost/skills` (user-global)
//! 3. `<cwd>/.skillhost/skills` (project-local)
//! 4. each entry of `$SKILLHOST_SKILLS_PATH`
//! 5. `skills.search_paths` from the config file

use std::{
    collections::HashSet,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{loader::config_dir, schema::SkillsConfig};

/// Environment variable holding extra skills directories, in the platform's
/// path-list syntax (`:`-separated on Unix).
pub const SKILLS_PATH_ENV: &str = "SKILLHOST_SKILLS_PATH";

/// Inputs that normally come from the process environment.
#[derive(Debug, Clone, Default)]
pub struct SearchEnv {
    pub cwd: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    /// Raw value of [`SKILLS_PATH_ENV`].
    pub skills_path: Option<OsString>,
}

impl SearchEnv {
    /// Capture the current process environment.
    pub fn from_process(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            home_dir: directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf()),
            config_dir: config_dir(),
            skills_path: std::env::var_os(SKILLS_PATH_ENV),
        }
    }
}

/// Skills base directories for `cwd`, lowest priority first.
pub fn search_paths(cwd: &Path, config: &SkillsConfig) -> Vec<PathBuf> {
    search_paths_with(config, &SearchEnv::from_process(cwd))
}

/// Same as [`search_paths`] with an explicit environment.
pub fn search_paths_with(config: &SkillsConfig, env: &SearchEnv) -> Vec<PathBuf> {
    if !config.enabled {
        return Vec::new();
    }

    let mut paths = Vec::new();
    if config.include_user {
        if let Some(dir) = &env.config_dir {
            paths.push(dir.join("skills"));
        }
        if let Some(home) = &env.home_dir {
            paths.push(home.join(".skillhost").join("skills"));
        }
    }
    if config.include_project {
        paths.push(env.cwd.join(".skillhost").join("skills"));
    }
    if let Some(raw) = &env.skills_path {
        paths.extend(
            std::env::split_paths(raw)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| absolutize(&p, env)),
        );
    }
    paths.extend(
        config
            .search_paths
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| absolutize(Path::new(p), env)),
    );

    dedup_keep_last(paths)
}

/// Expand `~/` and resolve relative paths against the working directory.
fn absolutize(path: &Path, env: &SearchEnv) -> PathBuf {
    if let (Ok(rest), Some(home)) = (path.strip_prefix("~"), &env.home_dir) {
        return home.join(rest);
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env.cwd.join(path)
    }
}

/// Drop duplicates, keeping each path at its highest-priority position.
fn dedup_keep_last(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut kept: Vec<PathBuf> = paths
        .into_iter()
        .rev()
        .filter(|p| seen.insert(p.clone()))
        .collect();
    kept.reverse();
    kept
}
