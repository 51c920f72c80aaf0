//! File-backed project repository.
//!
//! One JSON document per project at `<data_dir>/projects/<id>.json`, wrapped
//! in a versioned envelope. Writes go through [`write_atomic`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kroma_models::{Project, ProjectId, StoredProject, CURRENT_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::fs_utils::{read_optional, record_path, remove_optional, write_atomic};
use crate::repository::ProjectRepository;

/// Borrowed form of [`StoredProject`] for serialization.
#[derive(Serialize)]
struct StoredProjectRef<'a> {
    schema_version: u32,
    project: &'a Project,
}

/// Reads only the envelope version so newer layouts are rejected cleanly.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default = "legacy_version")]
    schema_version: u32,
}

fn legacy_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct FileProjectRepository {
    root: PathBuf,
}

impl FileProjectRepository {
    /// Open (and create if needed) the project directory under `data_dir`.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let root = data_dir.as_ref().join("projects");
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &ProjectId) -> StoreResult<PathBuf> {
        record_path(&self.root, id.as_str())
    }
}

/// Decode one stored record.
pub fn decode_record(key: &str, bytes: &[u8]) -> StoreResult<Project> {
    let probe: VersionProbe = serde_json::from_slice(bytes)?;
    if probe.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            key: key.to_string(),
            found: probe.schema_version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    let stored: StoredProject = serde_json::from_slice(bytes)?;
    let project = stored.project;

    if project.id.as_str() != key {
        return Err(StoreError::corrupt(format!(
            "{}: record holds project {}",
            key, project.id
        )));
    }
    if !project.is_consistent() {
        return Err(StoreError::corrupt(format!(
            "{}: scene status disagrees with its result fields",
            key
        )));
    }
    Ok(project)
}

/// Encode one record in the current envelope.
pub fn encode_record(project: &Project) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&StoredProjectRef {
        schema_version: CURRENT_SCHEMA_VERSION,
        project,
    })?)
}

#[async_trait]
impl ProjectRepository for FileProjectRepository {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, id: &ProjectId) -> StoreResult<Option<Project>> {
        let path = self.path_for(id)?;
        match read_optional(&path).await? {
            Some(bytes) => decode_record(id.as_str(), &bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn list(&self) -> StoreResult<Vec<Project>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let Some(bytes) = read_optional(&path).await? else {
                // Deleted between listing and reading
                continue;
            };
            match decode_record(key, &bytes) {
                Ok(project) => projects.push(project),
                Err(e) => warn!(record = %key, "Skipping unreadable project record: {}", e),
            }
        }

        debug!("Listed {} projects from {}", projects.len(), self.root.display());
        Ok(projects)
    }

    async fn put(&self, project: &Project) -> StoreResult<()> {
        let path = self.path_for(&project.id)?;
        write_atomic(path, encode_record(project)?).await
    }

    async fn delete(&self, id: &ProjectId) -> StoreResult<bool> {
        let path = self.path_for(id)?;
        remove_optional(&path).await
    }

    async fn ping(&self) -> StoreResult<()> {
        let metadata = tokio::fs::metadata(&self.root).await?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(StoreError::corrupt(format!(
                "{} is not a directory",
                self.root.display()
            )))
        }
    }
}
