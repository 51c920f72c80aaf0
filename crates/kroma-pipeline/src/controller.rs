//! Project production pipeline.
//!
//! Drives a project through script decomposition, character synthesis and
//! per-scene video synthesis.
//!
//! Every read-modify-write of a project record runs under one write lock:
//! load, apply the change, `touch()`, persist. Gateway calls never run while
//! the lock is held. Scene video completions reload the project under the
//! lock and only touch their own scene, so concurrent renders in one project
//! never overwrite each other.

use std::sync::Arc;
use std::time::Instant;

use kroma_gateway::{AiGateway, GatewayError, VideoRequest};
use kroma_models::{GenerationKind, PipelineStep, Project, ProjectId, Scene, SceneId, SceneStatus};
use kroma_store::{
    parse_clip_reference, retry_async, ClipStore, ProjectRepository, StoreError,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use crate::config::{PipelineConfig, MAX_SCENE_COUNT};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::ProjectLogger;
use crate::metering::{Charge, Meter};
use crate::metrics::{self, Outcome};
use crate::polling::VideoPoller;

/// Work captured by [`PipelineController::begin_scene_video`].
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub project_id: ProjectId,
    pub scene_id: SceneId,
    pub request: VideoRequest,
    charge: Option<Charge>,
}

/// How a scene render ended.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    /// The scene was updated to completed or error.
    Applied(Scene),
    /// The project or scene was deleted while rendering; nothing was written.
    Dropped,
}

/// The pipeline controller.
pub struct PipelineController {
    repo: Arc<dyn ProjectRepository>,
    clips: Arc<ClipStore>,
    gateway: Arc<dyn AiGateway>,
    meter: Meter,
    poller: VideoPoller,
    config: PipelineConfig,
    write_lock: Mutex<()>,
}

impl PipelineController {
    pub fn new(
        repo: Arc<dyn ProjectRepository>,
        clips: Arc<ClipStore>,
        gateway: Arc<dyn AiGateway>,
        meter: Meter,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repo,
            clips,
            gateway,
            meter,
            poller: VideoPoller::new(config.poll.clone()),
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    pub fn is_metered(&self) -> bool {
        self.meter.is_enabled()
    }

    // =========================================================================
    // Record access
    // =========================================================================

    async fn load(&self, id: &ProjectId) -> PipelineResult<Project> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::project_not_found(id))
    }

    async fn persist(&self, project: &Project) -> PipelineResult<()> {
        let config = self.config.persist_retry.named(format!("persist_project {}", project.id));
        retry_async(&config, || self.repo.put(project), StoreError::is_retryable)
            .await
            .into_result()
            .map_err(PipelineError::from)
    }

    /// Load, modify, touch and persist one project under the write lock.
    ///
    /// If `apply` fails nothing is written.
    async fn mutate<F>(&self, id: &ProjectId, apply: F) -> PipelineResult<Project>
    where
        F: FnOnce(&mut Project) -> PipelineResult<()> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut project = self.load(id).await?;
        apply(&mut project)?;
        project.touch();
        self.persist(&project).await?;
        Ok(project)
    }

    // =========================================================================
    // Project lifecycle
    // =========================================================================

    pub async fn create_project(&self, name: &str) -> PipelineResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PipelineError::validation("Project name must not be empty"));
        }

        let project = Project::new(name);
        let _guard = self.write_lock.lock().await;
        self.persist(&project).await?;

        ProjectLogger::new(&project.id, "create_project").log_completion(name);
        Ok(project)
    }

    /// Delete a project and its clips. Cannot be undone.
    pub async fn delete_project(&self, id: &ProjectId, confirmed: bool) -> PipelineResult<()> {
        if !confirmed {
            return Err(PipelineError::validation("Deletion requires confirmation"));
        }

        let logger = ProjectLogger::new(id, "delete_project");
        {
            let _guard = self.write_lock.lock().await;
            if !self.repo.delete(id).await? {
                return Err(PipelineError::project_not_found(id));
            }
        }

        if let Err(e) = self.clips.delete_project(id).await {
            logger.log_warning(&format!("Failed to remove clips: {}", e));
        }
        logger.log_completion("project deleted");
        Ok(())
    }

    pub async fn get_project(&self, id: &ProjectId) -> PipelineResult<Project> {
        self.load(id).await
    }

    /// All projects, newest created first.
    pub async fn list_projects(&self) -> PipelineResult<Vec<Project>> {
        let mut projects = self.repo.list().await?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    pub async fn rename_project(&self, id: &ProjectId, name: &str) -> PipelineResult<Project> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PipelineError::validation("Project name must not be empty"));
        }
        self.mutate(id, move |p| {
            p.name = name;
            Ok(())
        })
        .await
    }

    pub async fn set_script_prompt(&self, id: &ProjectId, prompt: &str) -> PipelineResult<Project> {
        let prompt = prompt.to_string();
        self.mutate(id, move |p| {
            p.script_prompt = prompt;
            Ok(())
        })
        .await
    }

    pub async fn set_character_prompt(
        &self,
        id: &ProjectId,
        prompt: &str,
    ) -> PipelineResult<Project> {
        let prompt = prompt.to_string();
        self.mutate(id, move |p| {
            p.character_prompt = prompt;
            Ok(())
        })
        .await
    }

    /// Navigate to any step. Steps are not monotonic.
    pub async fn set_step(&self, id: &ProjectId, step: PipelineStep) -> PipelineResult<Project> {
        self.mutate(id, move |p| {
            p.step = step;
            Ok(())
        })
        .await
    }

    pub async fn toggle_aspect_ratio(&self, id: &ProjectId) -> PipelineResult<Project> {
        self.mutate(id, |p| {
            p.aspect_ratio = p.aspect_ratio.toggled();
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Script and character
    // =========================================================================

    /// Decompose the script prompt into fresh scenes and move to the
    /// character step.
    ///
    /// Replaces every existing scene, edited descriptions included.
    pub async fn generate_script(
        &self,
        id: &ProjectId,
        scene_count: Option<u32>,
        user: Option<&str>,
    ) -> PipelineResult<Project> {
        let scene_count = scene_count.unwrap_or(self.config.default_scene_count);
        if scene_count == 0 || scene_count > MAX_SCENE_COUNT {
            return Err(PipelineError::validation(format!(
                "Scene count must be between 1 and {}",
                MAX_SCENE_COUNT
            )));
        }

        let snapshot = self.load(id).await?;
        let topic = snapshot.script_prompt.trim().to_string();
        if topic.is_empty() {
            return Err(PipelineError::validation("Script prompt must not be empty"));
        }

        let logger = ProjectLogger::new(id, "generate_script");
        logger.log_start(&format!("{} scenes", scene_count));

        let charge = self.meter.charge(user, GenerationKind::Script).await?;
        let started = Instant::now();
        let result = self.gateway.decompose_script(&topic, scene_count).await;
        let elapsed = started.elapsed().as_secs_f64();

        let descriptions = match result {
            Ok(descriptions) if !descriptions.is_empty() => descriptions,
            Ok(_) => {
                return Err(self
                    .generation_failed(&logger, GenerationKind::Script, elapsed, charge, "No script generated")
                    .await)
            }
            Err(e) => {
                return Err(self
                    .generation_failed(&logger, GenerationKind::Script, elapsed, charge, &e.to_string())
                    .await)
            }
        };

        let mut discarded = Vec::new();
        let applied = self
            .mutate(id, |p| {
                discarded = p.scenes.iter().map(|s| s.id.clone()).collect();
                p.replace_scenes(descriptions);
                p.step = PipelineStep::Character;
                Ok(())
            })
            .await;

        let project = match applied {
            Ok(project) => project,
            Err(e) => {
                self.meter.refund(charge).await;
                return Err(e);
            }
        };

        for scene_id in &discarded {
            self.remove_clip(&logger, id, scene_id).await;
        }

        metrics::record_generation(GenerationKind::Script, Outcome::Success, elapsed);
        logger.log_completion(&format!("{} scenes", project.scenes.len()));
        Ok(project)
    }

    /// Render the character reference image. Does not change the step.
    pub async fn generate_character(
        &self,
        id: &ProjectId,
        user: Option<&str>,
    ) -> PipelineResult<Project> {
        let snapshot = self.load(id).await?;
        let prompt = snapshot.character_prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(PipelineError::validation("Character prompt must not be empty"));
        }

        let logger = ProjectLogger::new(id, "generate_character");
        logger.log_start("rendering reference image");

        let charge = self.meter.charge(user, GenerationKind::Character).await?;
        let started = Instant::now();
        let result = self.gateway.synthesize_character_image(&prompt).await;
        let elapsed = started.elapsed().as_secs_f64();

        let image = match result {
            Ok(image) if !image.is_empty() => image,
            Ok(_) => {
                return Err(self
                    .generation_failed(&logger, GenerationKind::Character, elapsed, charge, "No image generated")
                    .await)
            }
            Err(e) => {
                return Err(self
                    .generation_failed(&logger, GenerationKind::Character, elapsed, charge, &e.to_string())
                    .await)
            }
        };

        let applied = self
            .mutate(id, move |p| {
                p.character_image_base64 = Some(image);
                Ok(())
            })
            .await;

        match applied {
            Ok(project) => {
                metrics::record_generation(GenerationKind::Character, Outcome::Success, elapsed);
                logger.log_completion("reference image stored");
                Ok(project)
            }
            Err(e) => {
                self.meter.refund(charge).await;
                Err(e)
            }
        }
    }

    /// Lock in the character and move to production.
    pub async fn confirm_character(&self, id: &ProjectId) -> PipelineResult<Project> {
        self.mutate(id, |p| {
            if !p.has_character() {
                return Err(PipelineError::validation(
                    "Generate a character before confirming",
                ));
            }
            p.step = PipelineStep::Production;
            Ok(())
        })
        .await
    }

    async fn generation_failed(
        &self,
        logger: &ProjectLogger,
        kind: GenerationKind,
        elapsed: f64,
        charge: Option<Charge>,
        message: &str,
    ) -> PipelineError {
        self.meter.refund(charge).await;
        metrics::record_generation(kind, Outcome::Failure, elapsed);
        logger.log_error(message);
        PipelineError::generation(message)
    }

    // =========================================================================
    // Scenes
    // =========================================================================

    /// Append a placeholder scene.
    pub async fn add_scene(&self, id: &ProjectId) -> PipelineResult<Project> {
        self.mutate(id, |p| {
            p.append_scene();
            Ok(())
        })
        .await
    }

    /// Remove a scene and its clip. Other scenes keep their order.
    pub async fn delete_scene(&self, id: &ProjectId, scene_id: &SceneId) -> PipelineResult<Project> {
        let project = self
            .mutate(id, |p| {
                p.remove_scene(scene_id)
                    .map(|_| ())
                    .ok_or_else(|| PipelineError::scene_not_found(scene_id))
            })
            .await?;

        let logger = ProjectLogger::new(id, "delete_scene").with_scene(scene_id);
        self.remove_clip(&logger, id, scene_id).await;
        Ok(project)
    }

    /// Replace a scene's description. Status is left as is.
    pub async fn edit_scene_description(
        &self,
        id: &ProjectId,
        scene_id: &SceneId,
        description: &str,
    ) -> PipelineResult<Project> {
        let description = description.to_string();
        self.mutate(id, move |p| {
            let scene = p
                .scene_mut(scene_id)
                .ok_or_else(|| PipelineError::scene_not_found(scene_id))?;
            scene.description = description;
            Ok(())
        })
        .await
    }

    /// Bytes of a completed scene's clip.
    pub async fn clip_bytes(&self, id: &ProjectId, scene_id: &SceneId) -> PipelineResult<Vec<u8>> {
        let project = self.load(id).await?;
        let scene = project
            .scene(scene_id)
            .ok_or_else(|| PipelineError::scene_not_found(scene_id))?;

        if scene.status() != SceneStatus::Completed {
            return Err(PipelineError::validation(format!(
                "Scene {} has no rendered clip",
                scene_id
            )));
        }
        let (clip_project, clip_scene) = scene
            .video_url()
            .and_then(parse_clip_reference)
            .ok_or_else(|| StoreError::corrupt(format!("scene {} has an invalid clip reference", scene_id)))?;

        Ok(self.clips.read(&clip_project, &clip_scene).await?)
    }

    async fn remove_clip(&self, logger: &ProjectLogger, id: &ProjectId, scene_id: &SceneId) {
        match self.clips.delete(id, scene_id).await {
            Ok(true) => debug!(project_id = %id, scene_id = %scene_id, "Removed clip"),
            Ok(false) => {}
            Err(e) => logger.log_warning(&format!("Failed to remove clip for {}: {}", scene_id, e)),
        }
    }

    // =========================================================================
    // Scene video
    // =========================================================================

    /// Put a scene into `generating` and capture what the render needs.
    ///
    /// The new status is persisted before any gateway I/O. Any previous
    /// result or error is cleared. A scene that is already generating is
    /// rejected with [`PipelineError::Conflict`], so at most one render per
    /// scene is in flight.
    pub async fn begin_scene_video(
        &self,
        id: &ProjectId,
        scene_id: &SceneId,
        user: Option<&str>,
    ) -> PipelineResult<(Scene, VideoJob)> {
        let snapshot = self.load(id).await?;
        let current = snapshot
            .scene(scene_id)
            .ok_or_else(|| PipelineError::scene_not_found(scene_id))?;
        if current.status() == SceneStatus::Generating {
            return Err(already_generating(scene_id));
        }

        let charge = self.meter.charge(user, GenerationKind::SceneVideo).await?;
        let applied = self
            .mutate(id, |p| {
                let scene = p
                    .scene_mut(scene_id)
                    .ok_or_else(|| PipelineError::scene_not_found(scene_id))?;
                // Another request may have started between the snapshot and the lock
                if scene.status() == SceneStatus::Generating {
                    return Err(already_generating(scene_id));
                }
                scene.mark_generating();
                Ok(())
            })
            .await;

        let project = match applied {
            Ok(project) => project,
            Err(e) => {
                self.meter.refund(charge).await;
                return Err(e);
            }
        };

        let scene = project
            .scene(scene_id)
            .cloned()
            .ok_or_else(|| PipelineError::scene_not_found(scene_id))?;
        let job = VideoJob {
            project_id: id.clone(),
            scene_id: scene_id.clone(),
            request: VideoRequest {
                prompt: scene.description.clone(),
                reference_image: project
                    .character_image_base64
                    .clone()
                    .filter(|img| !img.is_empty()),
                aspect_ratio: project.aspect_ratio,
            },
            charge,
        };

        ProjectLogger::new(id, "scene_video")
            .with_scene(scene_id)
            .log_start(&format!("scene {} generating", scene.order));
        Ok((scene, job))
    }

    /// Submit, poll, download and store the clip for one scene.
    async fn render(&self, job: &VideoJob, logger: &ProjectLogger) -> Result<String, GatewayError> {
        let operation = self.gateway.submit_video(&job.request).await?;
        logger.log_progress(&format!("submitted {}", operation.name));

        let uri = self.poller.wait(self.gateway.as_ref(), &operation).await?;
        let bytes = self.gateway.fetch_video(&uri).await?;
        logger.log_progress(&format!("downloaded {} bytes", bytes.len()));

        self.clips
            .save(&job.project_id, &job.scene_id, bytes)
            .await
            .map_err(|e| GatewayError::download_failed(format!("Failed to store clip: {}", e)))
    }

    /// Run the render and record its result on the scene.
    ///
    /// If the project or scene no longer exists when the render resolves,
    /// the result is dropped and nothing is written.
    pub async fn finish_scene_video(&self, job: VideoJob) -> PipelineResult<VideoOutcome> {
        let logger = ProjectLogger::new(&job.project_id, "scene_video").with_scene(&job.scene_id);
        let started = Instant::now();
        let result = self.render(&job, &logger).await;
        let elapsed = started.elapsed().as_secs_f64();

        if result.is_err() {
            self.meter.refund(job.charge.clone()).await;
        }

        let _guard = self.write_lock.lock().await;
        let current = self.repo.get(&job.project_id).await?;
        let Some(mut project) = current.filter(|p| p.scene(&job.scene_id).is_some()) else {
            debug!(
                project_id = %job.project_id,
                scene_id = %job.scene_id,
                "Dropping render result for deleted project or scene"
            );
            if result.is_ok() {
                self.remove_clip(&logger, &job.project_id, &job.scene_id).await;
            }
            metrics::record_generation(GenerationKind::SceneVideo, Outcome::Dropped, elapsed);
            return Ok(VideoOutcome::Dropped);
        };

        let Some(scene) = project.scene_mut(&job.scene_id) else {
            return Ok(VideoOutcome::Dropped);
        };
        match &result {
            Ok(url) => scene.complete(url.clone()),
            Err(e) => scene.fail(e.to_string()),
        }
        let scene = scene.clone();
        project.touch();

        if let Err(e) = self.persist(&project).await {
            logger.log_error(&format!("Failed to save render result: {}", e));
            if result.is_ok() {
                self.meter.refund(job.charge.clone()).await;
                self.remove_clip(&logger, &job.project_id, &job.scene_id).await;
            }
            self.record_unsaved_result(&mut project, &job.scene_id, &e, &logger)
                .await;
            metrics::record_generation(GenerationKind::SceneVideo, Outcome::Failure, elapsed);
            return Err(e);
        }

        match result {
            Ok(_) => {
                metrics::record_generation(GenerationKind::SceneVideo, Outcome::Success, elapsed);
                logger.log_completion(&format!("scene {} rendered", scene.order));
            }
            Err(e) => {
                metrics::record_generation(GenerationKind::SceneVideo, Outcome::Failure, elapsed);
                logger.log_error(&e.to_string());
            }
        }
        Ok(VideoOutcome::Applied(scene))
    }

    /// Best-effort second write after a render result could not be saved.
    ///
    /// Moves the scene to `error` so it does not stay in `generating` and
    /// can be started again.
    async fn record_unsaved_result(
        &self,
        project: &mut Project,
        scene_id: &SceneId,
        cause: &PipelineError,
        logger: &ProjectLogger,
    ) {
        let Some(scene) = project.scene_mut(scene_id) else {
            return;
        };
        scene.fail(format!("could not save result: {}", cause));
        project.touch();
        if let Err(e) = self.persist(project).await {
            logger.log_error(&format!("Scene left in generating: {}", e));
        }
    }

    /// Render a scene and wait for the result.
    pub async fn generate_scene_video(
        &self,
        id: &ProjectId,
        scene_id: &SceneId,
        user: Option<&str>,
    ) -> PipelineResult<VideoOutcome> {
        let (_, job) = self.begin_scene_video(id, scene_id, user).await?;
        self.finish_scene_video(job).await
    }

    /// Start a scene render in the background.
    ///
    /// Returns the scene in its `generating` state once that is persisted.
    /// Each call renders independently of other scenes.
    pub async fn spawn_scene_video(
        self: &Arc<Self>,
        id: &ProjectId,
        scene_id: &SceneId,
        user: Option<&str>,
    ) -> PipelineResult<(Scene, JoinHandle<PipelineResult<VideoOutcome>>)> {
        let (scene, job) = self.begin_scene_video(id, scene_id, user).await?;

        let span = ProjectLogger::new(id, "scene_video")
            .with_scene(scene_id)
            .create_span();
        let controller = Arc::clone(self);
        let handle = tokio::spawn(
            async move {
                let outcome = controller.finish_scene_video(job).await;
                if let Err(e) = &outcome {
                    tracing::error!("Scene render could not be recorded: {}", e);
                }
                outcome
            }
            .instrument(span),
        );

        Ok((scene, handle))
    }
}

fn already_generating(scene_id: &SceneId) -> PipelineError {
    PipelineError::conflict(format!("Scene {} is already generating", scene_id))
}
