//! Scene model and per-scene generation lifecycle.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Description given to scenes added by hand.
pub const NEW_SCENE_PLACEHOLDER: &str = "A new scene description...";

/// Unique identifier for a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    /// Generate a new random scene ID.
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

impl Default for SceneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Scene generation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    /// Waiting for the user to request a render
    #[default]
    Pending,
    /// A video synthesis call is in flight
    Generating,
    /// A rendered clip is available
    Completed,
    /// The last render attempt failed
    Error,
}

impl SceneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneStatus::Pending => "pending",
            SceneStatus::Generating => "generating",
            SceneStatus::Completed => "completed",
            SceneStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state for one render attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SceneStatus::Completed | SceneStatus::Error)
    }
}

impl fmt::Display for SceneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of video to be generated.
///
/// `status`, `video_url` and `error` only change together through
/// [`Scene::mark_generating`], [`Scene::complete`] and [`Scene::fail`], so
/// `video_url` is set iff the scene is completed and `error` is set iff it
/// failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub id: SceneId,
    /// 1-based position assigned at creation; never renumbered.
    pub order: u32,
    pub description: String,
    status: SceneStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Scene {
    /// Create a pending scene.
    pub fn new(order: u32, description: impl Into<String>) -> Self {
        Self {
            id: SceneId::new(),
            order,
            description: description.into(),
            status: SceneStatus::Pending,
            video_url: None,
            error: None,
        }
    }

    /// Create a pending scene with the placeholder description.
    pub fn placeholder(order: u32) -> Self {
        Self::new(order, NEW_SCENE_PLACEHOLDER)
    }

    pub fn status(&self) -> SceneStatus {
        self.status
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Enter `generating`, clearing any previous result.
    pub fn mark_generating(&mut self) {
        self.status = SceneStatus::Generating;
        self.video_url = None;
        self.error = None;
    }

    /// Enter `completed` with a playable clip reference.
    pub fn complete(&mut self, video_url: impl Into<String>) {
        self.status = SceneStatus::Completed;
        self.video_url = Some(video_url.into());
        self.error = None;
    }

    /// Enter `error` with a human-readable message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = SceneStatus::Error;
        self.video_url = None;
        self.error = Some(error.into());
    }

    /// True when status and result fields agree.
    ///
    /// Always holds for scenes built in-process; used to reject hand-edited
    /// or corrupted records on load.
    pub fn is_consistent(&self) -> bool {
        let url_ok = self.video_url.is_some() == (self.status == SceneStatus::Completed);
        let err_ok = self.error.is_some() == (self.status == SceneStatus::Error);
        url_ok && err_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scene_is_pending() {
        let scene = Scene::new(1, "Rainy street");
        assert_eq!(scene.status(), SceneStatus::Pending);
        assert!(scene.video_url().is_none());
        assert!(scene.error().is_none());
        assert!(scene.is_consistent());
    }

    #[test]
    fn test_lifecycle_keeps_result_fields_exclusive() {
        let mut scene = Scene::new(1, "Rainy street");

        scene.mark_generating();
        assert_eq!(scene.status(), SceneStatus::Generating);
        assert!(scene.is_consistent());

        scene.fail("No output");
        assert_eq!(scene.error(), Some("No output"));
        assert!(scene.video_url().is_none());
        assert!(scene.is_consistent());

        // Regenerating clears the previous error
        scene.mark_generating();
        assert!(scene.error().is_none());

        scene.complete("clip://p/s");
        assert_eq!(scene.video_url(), Some("clip://p/s"));
        assert!(scene.error().is_none());
        assert!(scene.is_consistent());
        assert!(scene.status().is_terminal());
    }

    #[test]
    fn test_placeholder_description() {
        let scene = Scene::placeholder(4);
        assert_eq!(scene.order, 4);
        assert_eq!(scene.description, NEW_SCENE_PLACEHOLDER);
    }

    #[test]
    fn test_inconsistent_record_detected() {
        let json = r#"{"id":"s1","order":1,"description":"x","status":"completed"}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert!(!scene.is_consistent());
    }

    #[test]
    fn test_serialization_omits_empty_results() {
        let scene = Scene::new(2, "Enter bar");
        let value = serde_json::to_value(&scene).unwrap();
        assert_eq!(value["status"], "pending");
        assert!(value.get("video_url").is_none());
        assert!(value.get("error").is_none());
    }
}
