//! Structured pipeline logging.
//!
//! Provides consistent lifecycle log lines and spans for pipeline
//! operations, keyed by project (and scene where one is involved).

use kroma_models::{ProjectId, SceneId};
use tracing::{error, info, warn, Span};

/// Logger for one pipeline operation on one project.
#[derive(Debug, Clone)]
pub struct ProjectLogger {
    project_id: String,
    scene_id: Option<String>,
    operation: String,
}

impl ProjectLogger {
    /// Create a logger for a project operation.
    ///
    /// # Arguments
    /// * `project_id` - The project being worked on
    /// * `operation` - The operation name (e.g., "generate_script", "scene_video")
    pub fn new(project_id: &ProjectId, operation: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            scene_id: None,
            operation: operation.to_string(),
        }
    }

    /// Scope the logger to one scene.
    pub fn with_scene(mut self, scene_id: &SceneId) -> Self {
        self.scene_id = Some(scene_id.to_string());
        self
    }

    fn scene(&self) -> &str {
        self.scene_id.as_deref().unwrap_or("-")
    }

    pub fn log_start(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            scene_id = %self.scene(),
            operation = %self.operation,
            "Operation started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            scene_id = %self.scene(),
            operation = %self.operation,
            "Operation progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            project_id = %self.project_id,
            scene_id = %self.scene(),
            operation = %self.operation,
            "Operation warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            project_id = %self.project_id,
            scene_id = %self.scene(),
            operation = %self.operation,
            "Operation failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            scene_id = %self.scene(),
            operation = %self.operation,
            "Operation completed: {}", message
        );
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this operation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "pipeline",
            project_id = %self.project_id,
            scene_id = %self.scene(),
            operation = %self.operation
        )
    }
}
