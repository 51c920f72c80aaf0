//! Project model.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AspectRatio, Scene, SceneId};

/// Schema version written with every persisted project.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Unique identifier for a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Generate a new random project ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Coarse stage of a project. Users may move freely between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    #[default]
    Script,
    Character,
    Production,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Script => "script",
            PipelineStep::Character => "character",
            PipelineStep::Production => "production",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's top-level production unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub step: PipelineStep,
    /// Seed for scene decomposition
    #[serde(default)]
    pub script_prompt: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub character_prompt: String,
    /// Character reference image (base64 PNG)
    #[serde(default)]
    pub character_image_base64: Option<String>,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

impl Project {
    /// Create an empty project at the script step.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            name: name.into(),
            created_at: now,
            last_modified: now,
            step: PipelineStep::Script,
            script_prompt: String::new(),
            scenes: Vec::new(),
            character_prompt: String::new(),
            character_image_base64: None,
            aspect_ratio: AspectRatio::default(),
        }
    }

    /// Record a mutation.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn scene(&self, scene_id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|s| &s.id == scene_id)
    }

    pub fn scene_mut(&mut self, scene_id: &SceneId) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| &s.id == scene_id)
    }

    /// Replace the whole scene list with fresh pending scenes ordered `1..=n`.
    pub fn replace_scenes<I, S>(&mut self, descriptions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scenes = descriptions
            .into_iter()
            .enumerate()
            .map(|(i, d)| Scene::new(i as u32 + 1, d))
            .collect();
    }

    /// Append a placeholder scene. Its order is the current count plus one,
    /// even if earlier deletions left gaps.
    pub fn append_scene(&mut self) -> &Scene {
        let order = self.scenes.len() as u32 + 1;
        self.scenes.push(Scene::placeholder(order));
        &self.scenes[self.scenes.len() - 1]
    }

    /// Remove a scene without renumbering the others.
    pub fn remove_scene(&mut self, scene_id: &SceneId) -> Option<Scene> {
        let index = self.scenes.iter().position(|s| &s.id == scene_id)?;
        Some(self.scenes.remove(index))
    }

    pub fn has_character(&self) -> bool {
        self.character_image_base64
            .as_deref()
            .is_some_and(|img| !img.is_empty())
    }

    /// True when every scene satisfies its status invariant.
    pub fn is_consistent(&self) -> bool {
        self.scenes.iter().all(Scene::is_consistent)
    }
}

/// Versioned envelope for a persisted project.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoredProject {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    pub project: Project,
}

/// Records written before versioning are treated as version 1.
fn legacy_schema_version() -> u32 {
    1
}

impl StoredProject {
    pub fn new(project: Project) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            project,
        }
    }
}
