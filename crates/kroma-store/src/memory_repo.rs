//! In-memory project repository.

use std::collections::HashMap;

use async_trait::async_trait;
use kroma_models::{Project, ProjectId};
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::repository::ProjectRepository;

#[derive(Debug, Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.projects.read().await.get(id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Project>> {
        Ok(self.projects.read().await.values().cloned().collect())
    }

    async fn put(&self, project: &Project) -> StoreResult<()> {
        self.projects
            .write()
            .await
            .insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn delete(&self, id: &ProjectId) -> StoreResult<bool> {
        Ok(self.projects.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let repo = InMemoryProjectRepository::new();
        let project = Project::new("Demo");

        repo.put(&project).await.unwrap();
        assert_eq!(repo.get(&project.id).await.unwrap(), Some(project.clone()));
        assert_eq!(repo.list().await.unwrap().len(), 1);

        assert!(repo.delete(&project.id).await.unwrap());
        assert!(!repo.delete(&project.id).await.unwrap());
        assert!(repo.get(&project.id).await.unwrap().is_none());
    }
}
