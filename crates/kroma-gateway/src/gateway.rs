//! The gateway trait.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::types::{VideoOperation, VideoPoll, VideoRequest};

/// Boundary to the generative-AI service.
///
/// Video synthesis is exposed in two phases so the caller owns the polling
/// policy: [`AiGateway::submit_video`] starts a long-running operation and
/// [`AiGateway::poll_video`] reports its state without blocking.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Break a topic into `scene_count` scene descriptions.
    async fn decompose_script(&self, topic: &str, scene_count: u32) -> GatewayResult<Vec<String>>;

    /// Render a character reference image, returned as base64 PNG.
    async fn synthesize_character_image(&self, prompt: &str) -> GatewayResult<String>;

    /// Start rendering one scene.
    async fn submit_video(&self, request: &VideoRequest) -> GatewayResult<VideoOperation>;

    /// Check a render started by [`AiGateway::submit_video`].
    async fn poll_video(&self, operation: &VideoOperation) -> GatewayResult<VideoPoll>;

    /// Download the rendered clip.
    async fn fetch_video(&self, uri: &str) -> GatewayResult<Vec<u8>>;
}
