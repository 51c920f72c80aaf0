//! Generative-AI gateway.
//!
//! The pipeline talks to the text, image and video models only through the
//! [`AiGateway`] trait. Two strategies exist:
//! - [`GeminiGateway`]: REST client for the Gemini `v1beta` API (text, image
//!   and Veo video synthesis)
//! - [`MockGateway`]: deterministic offline strategy for tests and demos
//!
//! The strategy is chosen once at startup from [`GatewayConfig`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod mock;
pub mod types;

use std::sync::Arc;

pub use config::{GatewayConfig, GatewayKind};
pub use error::{GatewayError, GatewayResult};
pub use gateway::AiGateway;
pub use gemini::GeminiGateway;
pub use mock::{MockGateway, MockVideoOutcome};
pub use types::{VideoOperation, VideoPoll, VideoRequest};

/// Build the configured gateway strategy.
pub fn build_gateway(config: &GatewayConfig) -> GatewayResult<Arc<dyn AiGateway>> {
    match config.kind {
        GatewayKind::Gemini => Ok(Arc::new(GeminiGateway::new(config.clone())?)),
        GatewayKind::Mock => Ok(Arc::new(MockGateway::new())),
    }
}
