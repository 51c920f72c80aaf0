//! Application state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use kroma_gateway::{build_gateway, AiGateway, GatewayConfig};
use kroma_models::ProjectId;
use kroma_pipeline::{Meter, PipelineConfig, PipelineController};
use kroma_store::{CreditsService, ProjectRepository, StoreConfig, Stores};
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PipelineController>,
    pub projects: Arc<dyn ProjectRepository>,
    pub credits: Arc<dyn CreditsService>,
    pub in_flight: Arc<InFlight>,
}

impl AppState {
    /// Create application state from environment configuration.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let store_config = StoreConfig::from_env();
        let stores = store_config.open().await?;

        let gateway_config = GatewayConfig::from_env();
        let gateway = build_gateway(&gateway_config)?;

        let pipeline_config = PipelineConfig::from_env();
        info!(
            store = stores.projects.backend(),
            data_dir = %store_config.data_dir.display(),
            gateway = gateway.name(),
            metering = pipeline_config.metering,
            "Pipeline configured"
        );

        Ok(Self::from_parts(config, stores, gateway, pipeline_config))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(
        config: ApiConfig,
        stores: Stores,
        gateway: Arc<dyn AiGateway>,
        pipeline_config: PipelineConfig,
    ) -> Self {
        let meter = if pipeline_config.metering {
            Meter::new(Arc::clone(&stores.credits), pipeline_config.costs)
        } else {
            Meter::disabled()
        };

        let pipeline = PipelineController::new(
            Arc::clone(&stores.projects),
            Arc::clone(&stores.clips),
            gateway,
            meter,
            pipeline_config,
        );

        Self {
            config,
            pipeline: Arc::new(pipeline),
            projects: stores.projects,
            credits: stores.credits,
            in_flight: Arc::new(InFlight::default()),
        }
    }
}

/// Project-level generations currently running.
///
/// Script and character generation are single-flight per project: a second
/// request for the same project and operation is rejected while the first
/// is still running.
#[derive(Debug, Default)]
pub struct InFlight {
    running: Mutex<HashSet<(ProjectId, &'static str)>>,
}

impl InFlight {
    /// Claim `operation` for `project_id`, or `None` if it is already running.
    pub fn try_acquire(
        self: &Arc<Self>,
        project_id: &ProjectId,
        operation: &'static str,
    ) -> Option<InFlightGuard> {
        let key = (project_id.clone(), operation);
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            owner: Arc::clone(self),
            key,
        })
    }

    pub fn is_running(&self, project_id: &ProjectId, operation: &'static str) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(project_id.clone(), operation))
    }
}

/// Releases its claim when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    owner: Arc<InFlight>,
    key: (ProjectId, &'static str),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight_per_project_and_operation() {
        let in_flight = Arc::new(InFlight::default());
        let a = ProjectId::from("a");
        let b = ProjectId::from("b");

        let guard = in_flight.try_acquire(&a, "script").unwrap();
        assert!(in_flight.try_acquire(&a, "script").is_none());
        assert!(in_flight.is_running(&a, "script"));

        // Other operations and projects are independent
        let _character = in_flight.try_acquire(&a, "character").unwrap();
        let _other = in_flight.try_acquire(&b, "script").unwrap();

        drop(guard);
        assert!(!in_flight.is_running(&a, "script"));
        assert!(in_flight.try_acquire(&a, "script").is_some());
    }
}
