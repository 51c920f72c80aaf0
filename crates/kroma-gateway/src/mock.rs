//! Deterministic offline gateway.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::AiGateway;
use crate::types::{VideoOperation, VideoPoll, VideoRequest};

/// 1×1 transparent PNG.
const PLACEHOLDER_PNG: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Minimal MP4 `ftyp` box served as clip content.
pub const PLACEHOLDER_MP4: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";

/// How mock video operations end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MockVideoOutcome {
    #[default]
    Rendered,
    /// Operation completes without a video URI
    NoOutput,
    /// Operation reports an error object
    OperationFailed(String),
    /// Operation completes but the download fails
    DownloadFailed,
}

/// Offline gateway with scripted answers and failure injection.
#[derive(Debug, Default)]
pub struct MockGateway {
    script: Option<Vec<String>>,
    script_failure: Option<String>,
    character_failure: Option<String>,
    video_outcome: MockVideoOutcome,
    pending_polls: u32,
    submissions: AtomicU32,
    polls: Mutex<HashMap<String, u32>>,
    last_request: Mutex<Option<VideoRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every decomposition with these descriptions.
    pub fn with_script<I, S>(mut self, descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script = Some(descriptions.into_iter().map(Into::into).collect());
        self
    }

    pub fn failing_script(mut self, message: impl Into<String>) -> Self {
        self.script_failure = Some(message.into());
        self
    }

    pub fn failing_character(mut self, message: impl Into<String>) -> Self {
        self.character_failure = Some(message.into());
        self
    }

    pub fn with_video_outcome(mut self, outcome: MockVideoOutcome) -> Self {
        self.video_outcome = outcome;
        self
    }

    /// Report `Pending` this many times per operation before finishing.
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Number of video operations submitted so far.
    pub fn submitted_videos(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Operations polled but not yet resolved.
    pub fn tracked_operations(&self) -> usize {
        self.polls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The most recent video request.
    pub fn last_video_request(&self) -> Option<VideoRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Base64 of the placeholder character image.
    pub fn placeholder_image() -> String {
        STANDARD.encode(PLACEHOLDER_PNG)
    }
}

#[async_trait]
impl AiGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn decompose_script(&self, topic: &str, scene_count: u32) -> GatewayResult<Vec<String>> {
        if let Some(message) = &self.script_failure {
            return Err(GatewayError::empty_result(message.clone()));
        }
        if let Some(script) = &self.script {
            return Ok(script.clone());
        }

        Ok((1..=scene_count)
            .map(|i| format!("Scene {} of \"{}\": a wide establishing shot", i, topic))
            .collect())
    }

    async fn synthesize_character_image(&self, _prompt: &str) -> GatewayResult<String> {
        match &self.character_failure {
            Some(message) => Err(GatewayError::empty_result(message.clone())),
            None => Ok(Self::placeholder_image()),
        }
    }

    async fn submit_video(&self, request: &VideoRequest) -> GatewayResult<VideoOperation> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let name = format!("mock/operations/{}", n);
        debug!(operation = %name, "Mock video submitted");
        Ok(VideoOperation::new(name))
    }

    async fn poll_video(&self, operation: &VideoOperation) -> GatewayResult<VideoPoll> {
        {
            let mut polls = self.polls.lock().unwrap_or_else(|e| e.into_inner());
            let seen = polls.entry(operation.name.clone()).or_insert(0);
            if *seen < self.pending_polls {
                *seen += 1;
                return Ok(VideoPoll::Pending);
            }
            // Resolved operations are not polled again
            polls.remove(&operation.name);
        }

        match &self.video_outcome {
            MockVideoOutcome::NoOutput => Ok(VideoPoll::Done { video_uri: None }),
            MockVideoOutcome::OperationFailed(message) => {
                Err(GatewayError::operation_failed(message.clone()))
            }
            MockVideoOutcome::Rendered | MockVideoOutcome::DownloadFailed => Ok(VideoPoll::Done {
                video_uri: Some(format!("mock://{}", operation.name)),
            }),
        }
    }

    async fn fetch_video(&self, uri: &str) -> GatewayResult<Vec<u8>> {
        if self.video_outcome == MockVideoOutcome::DownloadFailed {
            return Err(GatewayError::download_failed(format!(
                "Failed to download video file: {}",
                uri
            )));
        }
        Ok(PLACEHOLDER_MP4.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kroma_models::AspectRatio;

    fn request() -> VideoRequest {
        VideoRequest {
            prompt: "A cat jumps".to_string(),
            reference_image: None,
            aspect_ratio: AspectRatio::Portrait,
        }
    }

    #[tokio::test]
    async fn test_default_script_honours_count() {
        let gateway = MockGateway::new();
        let scenes = gateway.decompose_script("a cat learns to fly", 4).await.unwrap();
        assert_eq!(scenes.len(), 4);
    }

    #[tokio::test]
    async fn test_placeholder_image_is_png() {
        let gateway = MockGateway::new();
        let image = gateway.synthesize_character_image("hero").await.unwrap();
        let bytes = STANDARD.decode(image).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[tokio::test]
    async fn test_pending_polls_then_done() {
        let gateway = MockGateway::new().with_pending_polls(2);
        let op = gateway.submit_video(&request()).await.unwrap();

        assert_eq!(gateway.poll_video(&op).await.unwrap(), VideoPoll::Pending);
        assert_eq!(gateway.poll_video(&op).await.unwrap(), VideoPoll::Pending);
        assert_eq!(gateway.tracked_operations(), 1);
        assert!(gateway.poll_video(&op).await.unwrap().is_done());
        assert_eq!(gateway.tracked_operations(), 0);
        assert_eq!(gateway.submitted_videos(), 1);
        assert_eq!(
            gateway.last_video_request().unwrap().aspect_ratio,
            AspectRatio::Portrait
        );
    }

    #[tokio::test]
    async fn test_no_output_outcome() {
        let gateway = MockGateway::new().with_video_outcome(MockVideoOutcome::NoOutput);
        let op = gateway.submit_video(&request()).await.unwrap();
        assert_eq!(
            gateway.poll_video(&op).await.unwrap(),
            VideoPoll::Done { video_uri: None }
        );
    }
}
