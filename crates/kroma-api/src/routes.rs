//! API routes.

use axum::middleware;
use axum::routing::{get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::projects::{
    confirm_character, create_project, delete_project, generate_character, generate_script,
    get_project, list_projects, toggle_aspect_ratio, update_project,
};
use crate::handlers::scenes::{
    add_scene, delete_scene, edit_description, get_scene_video, start_scene_video,
};
use crate::handlers::users::{add_credits, get_profile, list_plans, stream_profile, update_plan};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let project_routes = Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/:id/aspect-ratio/toggle", post(toggle_aspect_ratio))
        // Generation steps
        .route("/projects/:id/script", post(generate_script))
        .route("/projects/:id/character", post(generate_character))
        .route("/projects/:id/character/confirm", post(confirm_character));

    let scene_routes = Router::new()
        .route("/projects/:id/scenes", post(add_scene))
        .route(
            "/projects/:id/scenes/:scene_id",
            axum::routing::delete(delete_scene),
        )
        .route(
            "/projects/:id/scenes/:scene_id/description",
            put(edit_description),
        )
        .route(
            "/projects/:id/scenes/:scene_id/video",
            get(get_scene_video).post(start_scene_video),
        );

    let user_routes = Router::new()
        .route("/users/:uid/profile", get(get_profile))
        .route("/users/:uid/profile/stream", get(stream_profile))
        .route("/users/:uid/credits", post(add_credits))
        .route("/users/:uid/plan", patch(update_plan))
        .route("/plans", get(list_plans));

    let api_routes = Router::new()
        .merge(project_routes)
        .merge(scene_routes)
        .merge(user_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
