use std::collections::HashMap;

use tracing::debug;

use crate::{
    discover::SkillDiscoverer,
    types::{Discovery, Skill},
};

/// Skills keyed by tool name, as a host registers them.
///
/// Skills are inserted in discovery order; when two share a tool name the
/// later one replaces the earlier, so higher-priority base directories win.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    skills: Vec<Skill>,
    by_tool: HashMap<String, usize>,
}

impl InMemoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the registry from a discoverer.
    pub async fn from_discoverer(discoverer: &dyn SkillDiscoverer) -> Self {
        Self::from_discovery(discoverer.discover().await)
    }

    pub fn from_discovery(discovery: Discovery) -> Self {
        let mut registry = Self::new();
        for skill in discovery.skills {
            registry.insert(skill);
        }
        registry
    }

    /// Register a skill, returning the one it replaced, if any.
    pub fn insert(&mut self, skill: Skill) -> Option<Skill> {
        match self.by_tool.get(&skill.identifier) {
            Some(&idx) => {
                debug!(
                    tool = %skill.identifier,
                    replaced = %self.skills[idx].marker_path.display(),
                    by = %skill.marker_path.display(),
                    "skill overridden by later discovery"
                );
                Some(std::mem::replace(&mut self.skills[idx], skill))
            },
            None => {
                self.by_tool
                    .insert(skill.identifier.clone(), self.skills.len());
                self.skills.push(skill);
                None
            },
        }
    }

    /// Look a skill up by its tool name.
    pub fn get(&self, tool_name: &str) -> Option<&Skill> {
        self.by_tool.get(tool_name).map(|&idx| &self.skills[idx])
    }

    /// Registered skills, in order of first registration.
    pub fn list(&self) -> &[Skill] {
        &self.skills
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.identifier.as_str())
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
