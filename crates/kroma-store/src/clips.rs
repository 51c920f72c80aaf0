//! Rendered clip storage.
//!
//! Clips are addressed by project and scene. A saved clip is referenced from
//! its scene as `clip://<project>/<scene>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kroma_models::{ProjectId, SceneId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::fs_utils::{read_optional, remove_optional, validate_key, write_atomic};

pub const CLIP_SCHEME: &str = "clip://";

/// Build the reference stored in a scene's `video_url`.
pub fn clip_reference(project_id: &ProjectId, scene_id: &SceneId) -> String {
    format!("{}{}/{}", CLIP_SCHEME, project_id, scene_id)
}

/// Split a `clip://` reference into its project and scene.
pub fn parse_clip_reference(reference: &str) -> Option<(ProjectId, SceneId)> {
    let rest = reference.strip_prefix(CLIP_SCHEME)?;
    let (project, scene) = rest.split_once('/')?;
    if project.is_empty() || scene.is_empty() || scene.contains('/') {
        return None;
    }
    Some((ProjectId::from(project), SceneId::from(scene)))
}

#[derive(Debug)]
enum Backend {
    Dir(PathBuf),
    Memory(RwLock<HashMap<(ProjectId, SceneId), Vec<u8>>>),
}

/// Store for rendered scene clips.
#[derive(Debug)]
pub struct ClipStore {
    backend: Backend,
}

impl ClipStore {
    /// Clips under `<data_dir>/clips/<project>/<scene>.mp4`.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let root = data_dir.as_ref().join("clips");
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            backend: Backend::Dir(root),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(HashMap::new())),
        }
    }

    fn clip_path(root: &Path, project_id: &ProjectId, scene_id: &SceneId) -> StoreResult<PathBuf> {
        validate_key(project_id.as_str())?;
        validate_key(scene_id.as_str())?;
        Ok(root
            .join(project_id.as_str())
            .join(format!("{}.mp4", scene_id)))
    }

    /// Save a clip and return its reference.
    pub async fn save(
        &self,
        project_id: &ProjectId,
        scene_id: &SceneId,
        bytes: Vec<u8>,
    ) -> StoreResult<String> {
        let size = bytes.len();
        match &self.backend {
            Backend::Dir(root) => {
                let path = Self::clip_path(root, project_id, scene_id)?;
                write_atomic(path, bytes).await?;
            }
            Backend::Memory(clips) => {
                clips
                    .write()
                    .await
                    .insert((project_id.clone(), scene_id.clone()), bytes);
            }
        }

        debug!(
            project_id = %project_id,
            scene_id = %scene_id,
            bytes = size,
            "Stored clip"
        );
        Ok(clip_reference(project_id, scene_id))
    }

    /// Read a clip.
    pub async fn read(&self, project_id: &ProjectId, scene_id: &SceneId) -> StoreResult<Vec<u8>> {
        let found = match &self.backend {
            Backend::Dir(root) => {
                let path = Self::clip_path(root, project_id, scene_id)?;
                read_optional(&path).await?
            }
            Backend::Memory(clips) => clips
                .read()
                .await
                .get(&(project_id.clone(), scene_id.clone()))
                .cloned(),
        };
        found.ok_or_else(|| StoreError::not_found(clip_reference(project_id, scene_id)))
    }

    /// Delete one clip, returning whether it existed.
    pub async fn delete(&self, project_id: &ProjectId, scene_id: &SceneId) -> StoreResult<bool> {
        match &self.backend {
            Backend::Dir(root) => {
                let path = Self::clip_path(root, project_id, scene_id)?;
                remove_optional(&path).await
            }
            Backend::Memory(clips) => Ok(clips
                .write()
                .await
                .remove(&(project_id.clone(), scene_id.clone()))
                .is_some()),
        }
    }

    /// Delete every clip of a project.
    pub async fn delete_project(&self, project_id: &ProjectId) -> StoreResult<()> {
        match &self.backend {
            Backend::Dir(root) => {
                validate_key(project_id.as_str())?;
                match tokio::fs::remove_dir_all(root.join(project_id.as_str())).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
            Backend::Memory(clips) => {
                clips.write().await.retain(|(p, _), _| p != project_id);
                Ok(())
            }
        }
    }
}
