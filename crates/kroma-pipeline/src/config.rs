//! Pipeline configuration.

use std::time::Duration;

use kroma_models::CreditCost;
use kroma_store::RetryConfig;

use crate::polling::PollPolicy;

/// Scene count used when the caller does not pass one.
pub const DEFAULT_SCENE_COUNT: u32 = 5;

/// Upper bound on scenes per decomposition.
pub const MAX_SCENE_COUNT: u32 = 20;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub default_scene_count: u32,
    pub poll: PollPolicy,
    /// Charge credits for gateway calls
    pub metering: bool,
    pub costs: CreditCost,
    /// Retry policy for project writes
    pub persist_retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_scene_count: DEFAULT_SCENE_COUNT,
            poll: PollPolicy::default(),
            metering: false,
            costs: CreditCost::default(),
            persist_retry: RetryConfig::new("persist_project"),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_scene_count: std::env::var("PIPELINE_SCENE_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| (1..=MAX_SCENE_COUNT).contains(n))
                .unwrap_or(DEFAULT_SCENE_COUNT),
            poll: PollPolicy {
                interval: Duration::from_secs(
                    std::env::var("VIDEO_POLL_INTERVAL_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(5),
                ),
                max_attempts: std::env::var("VIDEO_POLL_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            metering: std::env::var("PIPELINE_METERING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_scene_count, 5);
        assert_eq!(config.poll.interval, Duration::from_secs(5));
        assert!(config.poll.max_attempts.is_none());
        assert!(!config.metering);
        assert_eq!(config.persist_retry.max_retries, 3);
    }
}
