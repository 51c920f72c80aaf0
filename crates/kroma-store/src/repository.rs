//! Project repository trait.

use async_trait::async_trait;
use kroma_models::{Project, ProjectId};

use crate::error::StoreResult;

/// Durable storage of projects, one record per project.
///
/// Records are loaded lazily per call; callers serialise read-modify-write
/// sequences themselves.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Short backend name for logs and readiness output.
    fn backend(&self) -> &'static str;

    async fn get(&self, id: &ProjectId) -> StoreResult<Option<Project>>;

    /// All stored projects, in no particular order.
    async fn list(&self) -> StoreResult<Vec<Project>>;

    /// Insert or replace one project.
    async fn put(&self, project: &Project) -> StoreResult<()>;

    /// Remove a project, returning whether it existed.
    async fn delete(&self, id: &ProjectId) -> StoreResult<bool>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
