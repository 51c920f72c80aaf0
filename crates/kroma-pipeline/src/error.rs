//! Pipeline error types.

use kroma_store::StoreError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before any state change.
    #[error("{0}")]
    Validation(String),

    /// The gateway failed; project state is untouched.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("Insufficient credits: {needed} needed, {available} available")]
    InsufficientCredits { needed: u32, available: u32 },

    /// The requested work is already running.
    #[error("{0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn project_not_found(id: impl ToString) -> Self {
        Self::ProjectNotFound(id.to_string())
    }

    pub fn scene_not_found(id: impl ToString) -> Self {
        Self::SceneNotFound(id.to_string())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Check if the error leaves the caller something to fix.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_)
                | PipelineError::ProjectNotFound(_)
                | PipelineError::SceneNotFound(_)
                | PipelineError::InsufficientCredits { .. }
                | PipelineError::Conflict(_)
        )
    }
}
