//! User profile, credits and plan handlers.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use kroma_models::{pricing_catalogue, PlanTier, PricingTier, UserProfile};
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddCreditsRequest {
    #[validate(range(min = 1, max = 100000))]
    pub amount: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub plan: PlanTier,
}

/// Current profile. Unknown users get the starter profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state.credits.profile(&uid).await?;
    Ok(Json(profile))
}

/// Push the profile on connect and after every change.
pub async fn stream_profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let rx = state.credits.subscribe(&uid).await?;
    metrics::record_profile_stream();
    debug!(user_id = %uid, "Profile stream opened");

    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        // Sender dropped: end the stream
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let profile = rx.borrow_and_update().clone();
        let event = Event::default()
            .event("profile")
            .json_data(&profile)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        metrics::record_profile_event_sent();
        Some((Ok(event), (rx, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

pub async fn add_credits(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<AddCreditsRequest>,
) -> ApiResult<Json<UserProfile>> {
    request.validate()?;
    let profile = state.credits.credit(&uid, request.amount).await?;
    Ok(Json(profile))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<UpdatePlanRequest>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state.credits.set_plan(&uid, request.plan).await?;
    info!(user_id = %uid, plan = %request.plan, "Plan updated via API");
    Ok(Json(profile))
}

/// Paid tiers for the pricing page.
pub async fn list_plans() -> Json<Vec<PricingTier>> {
    Json(pricing_catalogue())
}
