//! Project handlers: lifecycle, script and character.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use kroma_models::{AspectRatio, PipelineStep, Project, ProjectId};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::middleware::user_id;
use crate::state::{AppState, InFlightGuard};

/// Dashboard entry; omits scenes and the character image.
#[derive(Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub step: PipelineStep,
    pub scene_count: usize,
    pub aspect_ratio: AspectRatio,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            created_at: project.created_at,
            last_modified: project.last_modified,
            step: project.step,
            scene_count: project.scenes.len(),
            aspect_ratio: project.aspect_ratio,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub script_prompt: Option<String>,
    #[validate(length(max = 4000))]
    pub character_prompt: Option<String>,
    pub step: Option<PipelineStep>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteProjectQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateScriptRequest {
    #[validate(range(min = 1, max = 20))]
    pub scene_count: Option<u32>,
}

/// Claim a single-flight slot or reject with `409`.
fn claim(state: &AppState, id: &ProjectId, operation: &'static str) -> ApiResult<InFlightGuard> {
    state.in_flight.try_acquire(id, operation).ok_or_else(|| {
        warn!(project_id = %id, operation, "Generation already running");
        metrics::record_generation_conflict(operation);
        ApiError::conflict(format!(
            "A {} generation is already running for this project",
            operation
        ))
    })
}

/// List projects, newest first.
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let projects = state.pipeline.list_projects().await?;
    Ok(Json(projects.iter().map(ProjectSummary::from).collect()))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    request.validate()?;
    let project = state.pipeline.create_project(&request.name).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    let project = state.pipeline.get_project(&ProjectId::from_string(id)).await?;
    Ok(Json(project))
}

/// Update any of name, prompts and step.
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    request.validate()?;
    let id = ProjectId::from_string(id);
    let pipeline = &state.pipeline;

    let mut project = None;
    if let Some(name) = &request.name {
        project = Some(pipeline.rename_project(&id, name).await?);
    }
    if let Some(prompt) = &request.script_prompt {
        project = Some(pipeline.set_script_prompt(&id, prompt).await?);
    }
    if let Some(prompt) = &request.character_prompt {
        project = Some(pipeline.set_character_prompt(&id, prompt).await?);
    }
    if let Some(step) = request.step {
        project = Some(pipeline.set_step(&id, step).await?);
    }

    let project = match project {
        Some(project) => project,
        None => pipeline.get_project(&id).await?,
    };
    Ok(Json(project))
}

/// Delete a project. Requires `?confirm=true`.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteProjectQuery>,
) -> ApiResult<StatusCode> {
    state
        .pipeline
        .delete_project(&ProjectId::from_string(id), query.confirm)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_aspect_ratio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    let project = state
        .pipeline
        .toggle_aspect_ratio(&ProjectId::from_string(id))
        .await?;
    Ok(Json(project))
}

/// Decompose the script prompt into scenes.
pub async fn generate_script(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<GenerateScriptRequest>>,
) -> ApiResult<Json<Project>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let id = ProjectId::from_string(id);
    let _guard = claim(&state, &id, "script")?;
    let user = user_id(&headers);

    let project = state
        .pipeline
        .generate_script(&id, request.scene_count, user.as_deref())
        .await?;
    Ok(Json(project))
}

/// Render the character reference image.
pub async fn generate_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Project>> {
    let id = ProjectId::from_string(id);
    let _guard = claim(&state, &id, "character")?;
    let user = user_id(&headers);

    let project = state
        .pipeline
        .generate_character(&id, user.as_deref())
        .await?;
    Ok(Json(project))
}

pub async fn confirm_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    let project = state
        .pipeline
        .confirm_character(&ProjectId::from_string(id))
        .await?;
    Ok(Json(project))
}
