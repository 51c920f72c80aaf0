//! Scene handlers: editing, video generation and clip playback.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use kroma_models::{Project, ProjectId, Scene, SceneId};
use kroma_pipeline::PipelineError;
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiResult;
use crate::metrics;
use crate::middleware::user_id;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct EditDescriptionRequest {
    /// Empty text is allowed
    #[validate(length(max = 4000))]
    pub description: String,
}

fn ids(project_id: String, scene_id: String) -> (ProjectId, SceneId) {
    (ProjectId::from_string(project_id), SceneId::from_string(scene_id))
}

/// Append a placeholder scene.
pub async fn add_scene(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.pipeline.add_scene(&ProjectId::from_string(id)).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn delete_scene(
    State(state): State<AppState>,
    Path((id, scene_id)): Path<(String, String)>,
) -> ApiResult<Json<Project>> {
    let (id, scene_id) = ids(id, scene_id);
    let project = state.pipeline.delete_scene(&id, &scene_id).await?;
    Ok(Json(project))
}

pub async fn edit_description(
    State(state): State<AppState>,
    Path((id, scene_id)): Path<(String, String)>,
    Json(request): Json<EditDescriptionRequest>,
) -> ApiResult<Json<Project>> {
    request.validate()?;
    let (id, scene_id) = ids(id, scene_id);
    let project = state
        .pipeline
        .edit_scene_description(&id, &scene_id, &request.description)
        .await?;
    Ok(Json(project))
}

/// Start rendering a scene.
///
/// Responds `202` with the scene in its generating state; the render
/// finishes in the background and lands on the project record. A scene
/// that is still generating answers `409`.
pub async fn start_scene_video(
    State(state): State<AppState>,
    Path((id, scene_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<Scene>)> {
    let (id, scene_id) = ids(id, scene_id);
    let user = user_id(&headers);

    let (scene, _handle) = state
        .pipeline
        .spawn_scene_video(&id, &scene_id, user.as_deref())
        .await
        .inspect_err(|e| {
            if matches!(e, PipelineError::Conflict(_)) {
                metrics::record_generation_conflict("scene_video");
            }
        })?;
    Ok((StatusCode::ACCEPTED, Json(scene)))
}

/// Stream a rendered clip.
pub async fn get_scene_video(
    State(state): State<AppState>,
    Path((id, scene_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (id, scene_id) = ids(id, scene_id);
    let bytes = state.pipeline.clip_bytes(&id, &scene_id).await?;

    let disposition = format!("inline; filename=\"scene-{}.mp4\"", scene_id);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response())
}
