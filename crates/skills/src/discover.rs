use std::{
    collections::{HashMap, HashSet, VecDeque},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    skillhost_config::{SearchEnv, SkillsConfig},
    tracing::{debug, info},
};

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink},
    error::{Error, Result},
    parse,
    types::{Collision, Discovery, MARKER_FILENAME, Skill},
};

/// Discovers skills from filesystem paths.
#[async_trait]
pub trait SkillDiscoverer: Send + Sync {
    /// Run one discovery pass. Always completes; problems become diagnostics.
    async fn discover(&self) -> Discovery;
}

/// Default filesystem-based skill discoverer.
///
/// Walks every base directory breadth-first with an explicit queue, following
/// symlinks and skipping any directory whose canonical path was already
/// visited in the same walk.
pub struct FsSkillDiscoverer {
    /// Base directories, lowest priority first.
    base_dirs: Vec<PathBuf>,
    sink: Arc<dyn DiagnosticSink>,
}

impl FsSkillDiscoverer {
    /// Create a discoverer over absolute base directories.
    ///
    /// Diagnostics go to [`TracingSink`] unless replaced with [`Self::with_sink`].
    pub fn new(base_dirs: Vec<PathBuf>) -> Result<Self> {
        if let Some(relative) = base_dirs.iter().find(|p| !p.is_absolute()) {
            return Err(Error::RelativeBaseDir(relative.clone()));
        }
        Ok(Self {
            base_dirs,
            sink: Arc::new(TracingSink),
        })
    }

    /// Discoverer over the configured search paths for `cwd`.
    pub fn from_config(cwd: &Path, config: &SkillsConfig) -> Result<Self> {
        Self::from_env(config, &SearchEnv::from_process(cwd))
    }

    /// Same as [`Self::from_config`] with an explicit environment.
    pub fn from_env(config: &SkillsConfig, env: &SearchEnv) -> Result<Self> {
        Self::new(skillhost_config::search_paths_with(config, env))
    }

    /// Build the default search paths for skill discovery.
    pub fn default_paths(cwd: &Path) -> Vec<PathBuf> {
        let config = skillhost_config::discover_and_load(cwd);
        skillhost_config::search_paths(cwd, &config.skills)
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn base_dirs(&self) -> &[PathBuf] {
        &self.base_dirs
    }

    fn traversal_error(&self, path: &Path, e: &io::Error) {
        self.sink.emit(
            Diagnostic::warning(
                DiagnosticKind::Traversal,
                format!("skipping {}: {e}", path.display()),
            )
            .with_path(path),
        );
    }

    /// Collect every marker file below `root`, in walk order.
    async fn find_markers(&self, root: &Path) -> Vec<PathBuf> {
        let mut markers = Vec::new();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut queue = VecDeque::from([root.to_path_buf()]);

        while let Some(dir) = queue.pop_front() {
            let real = match tokio::fs::canonicalize(&dir).await {
                Ok(real) => real,
                Err(e) => {
                    self.traversal_error(&dir, &e);
                    continue;
                },
            };
            if !visited.insert(real) {
                debug!(dir = %dir.display(), "already visited, skipping");
                continue;
            }

            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) => {
                    self.traversal_error(&dir, &e);
                    continue;
                },
            };
            let mut entries = Vec::new();
            loop {
                match read_dir.next_entry().await {
                    Ok(Some(entry)) => entries.push(entry),
                    Ok(None) => break,
                    Err(e) => {
                        self.traversal_error(&dir, &e);
                        break;
                    },
                }
            }
            entries.sort_by_key(tokio::fs::DirEntry::file_name);

            for entry in entries {
                let path = entry.path();
                let is_marker = entry.file_name() == MARKER_FILENAME;
                let file_type = match entry.file_type().await {
                    Ok(ft) => ft,
                    Err(e) => {
                        self.traversal_error(&path, &e);
                        continue;
                    },
                };

                if file_type.is_symlink() {
                    // Resolve the target but keep walking under the link path.
                    match tokio::fs::metadata(&path).await {
                        Ok(meta) if meta.is_dir() => queue.push_back(path),
                        Ok(meta) if meta.is_file() && is_marker => markers.push(path),
                        Ok(_) => {},
                        Err(e) => self.traversal_error(&path, &e),
                    }
                } else if file_type.is_dir() {
                    queue.push_back(path);
                } else if file_type.is_file() && is_marker {
                    markers.push(path);
                }
            }
        }

        markers
    }

    /// Walk one existing base directory and parse what it contains.
    async fn discover_base(&self, base: &Path, discovery: &mut Discovery) {
        for marker in self.find_markers(base).await {
            match parse::parse_skill(&marker, base).await {
                Ok(skill) => {
                    debug!(
                        name = %skill.name,
                        tool = %skill.identifier,
                        path = %skill.marker_path.display(),
                        "discovered skill"
                    );
                    discovery.skills.push(skill);
                },
                Err(rejection) => {
                    discovery.rejected += 1;
                    self.sink.emit(
                        Diagnostic::warning(DiagnosticKind::Rejected, rejection.to_string())
                            .with_path(rejection.path().clone()),
                    );
                },
            }
        }
    }
}

#[async_trait]
impl SkillDiscoverer for FsSkillDiscoverer {
    async fn discover(&self) -> Discovery {
        let mut discovery = Discovery::default();
        let mut found_base = false;

        for base in &self.base_dirs {
            match tokio::fs::metadata(base).await {
                Ok(meta) if meta.is_dir() => {},
                Ok(_) => {
                    found_base = true;
                    self.sink.emit(
                        Diagnostic::warning(
                            DiagnosticKind::Traversal,
                            format!("base path is not a directory: {}", base.display()),
                        )
                        .with_path(base),
                    );
                    continue;
                },
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                    ) =>
                {
                    debug!(base = %base.display(), "skills base directory does not exist");
                    discovery.missing.push(base.clone());
                    continue;
                },
                Err(e) => {
                    found_base = true;
                    self.traversal_error(base, &e);
                    continue;
                },
            }

            found_base = true;
            self.discover_base(base, &mut discovery).await;
        }

        if !found_base && !self.base_dirs.is_empty() {
            let attempted = self
                .base_dirs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.sink.emit(Diagnostic::warning(
                DiagnosticKind::NoBaseDirectories,
                format!("no skills directories found, searched: {attempted}"),
            ));
        }

        discovery.collisions = find_collisions(&discovery.skills);
        for collision in &discovery.collisions {
            let markers = collision
                .markers
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.sink.emit(Diagnostic::warning(
                DiagnosticKind::DuplicateIdentifier,
                format!(
                    "tool name '{}' is produced by {} skills ({markers}); the last one wins",
                    collision.identifier,
                    collision.markers.len()
                ),
            ));
        }

        info!(
            skills = discovery.skills.len(),
            rejected = discovery.rejected,
            collisions = discovery.collisions.len(),
            "skill discovery complete"
        );
        if !discovery.skills.is_empty() {
            self.sink.emit(Diagnostic::info(
                DiagnosticKind::Discovered,
                format!("discovered {} skills", discovery.skills.len()),
            ));
        }

        discovery
    }
}

/// Tool names shared by more than one skill, in first-seen order.
pub fn find_collisions(skills: &[Skill]) -> Vec<Collision> {
    let mut order: Vec<&str> = Vec::new();
    let mut markers: HashMap<&str, Vec<PathBuf>> = HashMap::new();
    for skill in skills {
        let entry = markers.entry(skill.identifier.as_str()).or_default();
        if entry.is_empty() {
            order.push(&skill.identifier);
        }
        entry.push(skill.marker_path.clone());
    }

    order
        .into_iter()
        .filter_map(|identifier| {
            let markers = markers.remove(identifier)?;
            (markers.len() > 1).then(|| Collision {
                identifier: identifier.to_string(),
                markers,
            })
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::diagnostics::{MemorySink, Severity},
    };

    const DESC: &str = "A skill used by the discovery tests";

    fn write_skill(base: &Path, rel: &str, name: &str, description: &str) {
        let dir = base.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n# {name}\n"),
        )
        .unwrap();
    }

    fn discoverer(paths: Vec<PathBuf>) -> (FsSkillDiscoverer, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let d = FsSkillDiscoverer::new(paths)
            .unwrap()
            .with_sink(sink.clone());
        (d, sink)
    }

    #[tokio::test]
    async fn test_discover_nested_skills() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("skills");
        write_skill(&base, "my-skill", "my-skill", DESC);
        write_skill(&base, "document-skills/pdf", "pdf", DESC);
        write_skill(&base, "a/b/c/deep", "deep", DESC);

        let (d, sink) = discoverer(vec![base]);
        let discovery = d.discover().await;

        let mut tools: Vec<&str> = discovery
            .skills
            .iter()
            .map(|s| s.identifier.as_str())
            .collect();
        tools.sort_unstable();
        assert_eq!(
            tools,
            vec!["skills_a_b_c_deep", "skills_document_skills_pdf", "skills_my_skill"]
        );
        assert!(discovery.collisions.is_empty());
        assert_eq!(sink.count(Severity::Warning), 0);
    }

    #[tokio::test]
    async fn test_walk_order_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("skills");
        write_skill(&base, "zeta", "zeta", DESC);
        write_skill(&base, "alpha", "alpha", DESC);
        write_skill(&base, "group/beta", "beta", DESC);

        let (d, _) = discoverer(vec![base]);
        let first: Vec<String> = d.discover().await.skills.into_iter().map(|s| s.name).collect();
        let second: Vec<String> = d.discover().await.skills.into_iter().map(|s| s.name).collect();
        assert_eq!(first, vec!["alpha", "zeta", "beta"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_discover_skips_missing_dirs() {
        let (d, sink) = discoverer(vec![PathBuf::from("/nonexistent/skillhost/path")]);
        let discovery = d.discover().await;
        assert!(discovery.is_empty());
        assert_eq!(
            discovery.missing,
            vec![PathBuf::from("/nonexistent/skillhost/path")]
        );
        let warnings = sink.of_kind(DiagnosticKind::NoBaseDirectories);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("/nonexistent/skillhost/path"));
    }

    #[tokio::test]
    async fn test_missing_dir_alongside_existing_is_quiet() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("skills");
        write_skill(&base, "one", "one", DESC);

        let (d, sink) = discoverer(vec![tmp.path().join("absent"), base]);
        let discovery = d.discover().await;
        assert_eq!(discovery.skills.len(), 1);
        assert_eq!(discovery.missing.len(), 1);
        assert!(sink.of_kind(DiagnosticKind::NoBaseDirectories).is_empty());
    }

    #[tokio::test]
    async fn test_empty_base_list() {
        let (d, sink) = discoverer(Vec::new());
        let discovery = d.discover().await;
        assert!(discovery.is_empty());
        assert!(sink.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_from_env_uses_project_and_extra_paths() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join(".skillhost/skills"), "local", "local", DESC);
        write_skill(&tmp.path().join("shared"), "team", "team", DESC);

        let config = SkillsConfig {
            search_paths: vec!["shared".into()],
            ..Default::default()
        };
        let env = SearchEnv {
            cwd: tmp.path().to_path_buf(),
            home_dir: Some(tmp.path().join("home")),
            config_dir: Some(tmp.path().join("config")),
            skills_path: None,
        };
        let d = FsSkillDiscoverer::from_env(&config, &env)
            .unwrap()
            .with_sink(Arc::new(MemorySink::new()));
        assert_eq!(d.base_dirs(), &[
            tmp.path().join("config/skills"),
            tmp.path().join("home/.skillhost/skills"),
            tmp.path().join(".skillhost/skills"),
            tmp.path().join("shared"),
        ]);

        let discovery = d.discover().await;
        let names: Vec<String> = discovery.skills.into_iter().map(|s| s.name).collect();
        // Extra paths have the highest priority, so they come last.
        assert_eq!(names, vec!["local", "team"]);
        assert_eq!(discovery.missing.len(), 2);
    }

    #[test]
    fn test_default_paths_reads_project_config() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("skillhost.toml"),
            "[skills]\ninclude_user = false\nsearch_paths = [\"extra\"]\n",
        )
        .unwrap();

        let paths = FsSkillDiscoverer::default_paths(tmp.path());
        assert!(paths.contains(&tmp.path().join(".skillhost/skills")));
        assert_eq!(paths.last(), Some(&tmp.path().join("extra")));
    }

    #[tokio::test]
    async fn test_base_under_regular_file_counts_as_missing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("afile"), "not a directory").unwrap();
        let base = tmp.path().join("afile/sub");

        let (d, sink) = discoverer(vec![base.clone()]);
        let discovery = d.discover().await;
        assert!(discovery.is_empty());
        assert_eq!(discovery.missing, vec![base]);
        assert!(sink.of_kind(DiagnosticKind::Traversal).is_empty());
        assert_eq!(sink.of_kind(DiagnosticKind::NoBaseDirectories).len(), 1);
    }

    #[test]
    fn test_relative_base_rejected() {
        let result = FsSkillDiscoverer::new(vec![PathBuf::from("relative/skills")]);
        assert!(matches!(result, Err(Error::RelativeBaseDir(_))));
    }

    #[tokio::test]
    async fn test_discover_skips_dirs_without_skill_md() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("skills");
        std::fs::create_dir_all(base.join("not-a-skill")).unwrap();
        std::fs::write(base.join("not-a-skill/README.md"), "hello").unwrap();
        std::fs::write(base.join("not-a-skill/skill.md"), "wrong case").unwrap();

        let (d, _) = discoverer(vec![base]);
        assert!(d.discover().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_skill_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("skills");
        write_skill(&base, "good", "good", DESC);
        write_skill(&base, "bad", "bad", "too short");

        let (d, sink) = discoverer(vec![base.clone()]);
        let discovery = d.discover().await;
        assert_eq!(discovery.skills.len(), 1);
        assert_eq!(discovery.skills[0].name, "good");
        assert_eq!(discovery.rejected, 1);

        let rejected = sink.of_kind(DiagnosticKind::Rejected);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].path, Some(base.join("bad/SKILL.md")));
        assert!(rejected[0].message.contains("description"));
    }

    #[tokio::test]
    async fn test_name_mismatch_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("skills");
        write_skill(&base, "folder", "other-name", DESC);

        let (d, sink) = discoverer(vec![base]);
        assert!(d.discover().await.is_empty());
        let rejected = sink.of_kind(DiagnosticKind::Rejected);
        assert!(rejected[0].message.contains("'other-name'"));
        assert!(rejected[0].message.contains("'folder'"));
    }

    #[tokio::test]
    async fn test_collisions_reported_not_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("global");
        let second = tmp.path().join("project");
        write_skill(&first, "git-helper", "git-helper", DESC);
        write_skill(&second, "git-helper", "git-helper", DESC);
        // `a-b/c` and `a/b-c` both map to skills_a_b_c.
        write_skill(&second, "a-b/c", "c", DESC);
        write_skill(&second, "a/b-c", "b-c", DESC);

        let (d, sink) = discoverer(vec![first.clone(), second.clone()]);
        let discovery = d.discover().await;
        assert_eq!(discovery.skills.len(), 4);
        assert_eq!(discovery.collisions.len(), 2);

        let git = discovery
            .collisions
            .iter()
            .find(|c| c.identifier == "skills_git_helper")
            .unwrap();
        assert_eq!(
            git.markers,
            vec![
                first.join("git-helper/SKILL.md"),
                second.join("git-helper/SKILL.md")
            ]
        );
        assert!(
            discovery
                .collisions
                .iter()
                .any(|c| c.identifier == "skills_a_b_c")
        );
        assert_eq!(sink.of_kind(DiagnosticKind::DuplicateIdentifier).len(), 2);
    }

    #[tokio::test]
    async fn test_base_order_is_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let low = tmp.path().join("low");
        let high = tmp.path().join("high");
        write_skill(&low, "zzz", "zzz", DESC);
        write_skill(&high, "aaa", "aaa", DESC);

        let (d, _) = discoverer(vec![low, high]);
        let names: Vec<String> = d.discover().await.skills.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["zzz", "aaa"]);
    }

    #[test]
    fn test_find_collisions_first_seen_order() {
        let skill = |id: &str, marker: &str| Skill {
            name: "x".into(),
            identifier: id.into(),
            directory: PathBuf::from("/x"),
            marker_path: PathBuf::from(marker),
            description: DESC.into(),
            license: None,
            allowed_tools: None,
            metadata: None,
            content: String::new(),
        };
        let skills = vec![
            skill("skills_b", "/1"),
            skill("skills_a", "/2"),
            skill("skills_a", "/3"),
            skill("skills_b", "/4"),
            skill("skills_c", "/5"),
        ];
        let collisions = find_collisions(&skills);
        let ids: Vec<&str> = collisions.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, vec!["skills_b", "skills_a"]);
    }

    #[cfg(unix)]
    mod symlinks {
        use {super::*, std::os::unix::fs::symlink};

        #[tokio::test]
        async fn test_symlinked_skill_reports_link_path() {
            let tmp = tempfile::tempdir().unwrap();
            let outside = tmp.path().join("outside");
            write_skill(&outside, "linked", "linked", DESC);
            let base = tmp.path().join("skills");
            std::fs::create_dir_all(&base).unwrap();
            symlink(outside.join("linked"), base.join("linked")).unwrap();

            let (d, _) = discoverer(vec![base.clone()]);
            let discovery = d.discover().await;
            assert_eq!(discovery.skills.len(), 1);
            let skill = &discovery.skills[0];
            assert_eq!(skill.directory, base.join("linked"));
            assert_eq!(skill.marker_path, base.join("linked/SKILL.md"));
            assert_eq!(skill.identifier, "skills_linked");
        }

        #[tokio::test]
        async fn test_symlinked_marker_file() {
            let tmp = tempfile::tempdir().unwrap();
            let outside = tmp.path().join("outside");
            write_skill(&outside, "shared", "shared", DESC);
            let base = tmp.path().join("skills");
            std::fs::create_dir_all(base.join("shared")).unwrap();
            symlink(
                outside.join("shared/SKILL.md"),
                base.join("shared/SKILL.md"),
            )
            .unwrap();

            let (d, _) = discoverer(vec![base.clone()]);
            let discovery = d.discover().await;
            assert_eq!(discovery.skills.len(), 1);
            assert_eq!(discovery.skills[0].marker_path, base.join("shared/SKILL.md"));
        }

        #[tokio::test]
        async fn test_symlink_into_sibling_subtree_visited_once() {
            let tmp = tempfile::tempdir().unwrap();
            let base = tmp.path().join("skills");
            write_skill(&base, "zreal/pdf", "pdf", DESC);
            symlink(base.join("zreal"), base.join("alink")).unwrap();

            let (d, _) = discoverer(vec![base.clone()]);
            let discovery = d.discover().await;
            assert_eq!(discovery.skills.len(), 1);
            let skill = &discovery.skills[0];
            assert_eq!(skill.marker_path, base.join("alink/pdf/SKILL.md"));
            assert_eq!(skill.identifier, "skills_alink_pdf");
            assert!(discovery.collisions.is_empty());
        }

        #[tokio::test]
        async fn test_symlink_cycle_terminates() {
            let tmp = tempfile::tempdir().unwrap();
            let base = tmp.path().join("skills");
            write_skill(&base, "looped", "looped", DESC);
            symlink(&base, base.join("looped/back-to-root")).unwrap();
            symlink(base.join("looped"), base.join("looped/self")).unwrap();

            let (d, _) = discoverer(vec![base]);
            let discovery = d.discover().await;
            assert_eq!(discovery.skills.len(), 1);
            assert_eq!(discovery.skills[0].identifier, "skills_looped");
        }

        #[tokio::test]
        async fn test_broken_symlink_skipped() {
            let tmp = tempfile::tempdir().unwrap();
            let base = tmp.path().join("skills");
            write_skill(&base, "fine", "fine", DESC);
            symlink(tmp.path().join("does-not-exist"), base.join("dangling")).unwrap();

            let (d, sink) = discoverer(vec![base.clone()]);
            let discovery = d.discover().await;
            assert_eq!(discovery.skills.len(), 1);
            let traversal = sink.of_kind(DiagnosticKind::Traversal);
            assert_eq!(traversal.len(), 1);
            assert_eq!(traversal[0].path, Some(base.join("dangling")));
        }

        #[tokio::test]
        async fn test_symlinked_base_directory() {
            let tmp = tempfile::tempdir().unwrap();
            let real = tmp.path().join("real");
            write_skill(&real, "via-link", "via-link", DESC);
            let link = tmp.path().join("link");
            symlink(&real, &link).unwrap();

            let (d, _) = discoverer(vec![link.clone()]);
            let discovery = d.discover().await;
            assert_eq!(discovery.skills.len(), 1);
            assert_eq!(discovery.skills[0].directory, link.join("via-link"));
        }
    }
}
