//! Caller-side polling of long-running video operations.

use std::time::Duration;

use kroma_gateway::{AiGateway, GatewayError, GatewayResult, VideoOperation, VideoPoll};
use tracing::debug;

/// How often and how long to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the operation finishes
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

/// Drives [`AiGateway::poll_video`] until an operation finishes.
#[derive(Debug, Clone, Default)]
pub struct VideoPoller {
    policy: PollPolicy,
}

impl VideoPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until done and return the video URI.
    ///
    /// A finished operation without a URI is [`GatewayError::NoOutput`].
    pub async fn wait(
        &self,
        gateway: &dyn AiGateway,
        operation: &VideoOperation,
    ) -> GatewayResult<String> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match gateway.poll_video(operation).await? {
                VideoPoll::Done {
                    video_uri: Some(uri),
                } => {
                    debug!(operation = %operation.name, attempts, "Video operation finished");
                    return Ok(uri);
                }
                VideoPoll::Done { video_uri: None } => return Err(GatewayError::NoOutput),
                VideoPoll::Pending => {}
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(GatewayError::PollTimeout { attempts });
                }
            }
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kroma_gateway::{MockGateway, MockVideoOutcome, VideoRequest};
    use kroma_models::AspectRatio;

    fn fast(max_attempts: Option<u32>) -> VideoPoller {
        VideoPoller::new(PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        })
    }

    async fn submit(gateway: &MockGateway) -> VideoOperation {
        gateway
            .submit_video(&VideoRequest {
                prompt: "scene".to_string(),
                reference_image: None,
                aspect_ratio: AspectRatio::Landscape,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_wait_until_done() {
        let gateway = MockGateway::new().with_pending_polls(3);
        let op = submit(&gateway).await;

        let uri = fast(None).wait(&gateway, &op).await.unwrap();
        assert!(uri.starts_with("mock://"));
    }

    #[tokio::test]
    async fn test_done_without_uri_is_no_output() {
        let gateway = MockGateway::new().with_video_outcome(MockVideoOutcome::NoOutput);
        let op = submit(&gateway).await;

        let err = fast(None).wait(&gateway, &op).await.unwrap_err();
        assert!(matches!(err, GatewayError::NoOutput));
    }

    #[tokio::test]
    async fn test_max_attempts_bounds_polling() {
        let gateway = MockGateway::new().with_pending_polls(10);
        let op = submit(&gateway).await;

        let err = fast(Some(3)).wait(&gateway, &op).await.unwrap_err();
        assert!(matches!(err, GatewayError::PollTimeout { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_operation_error_propagates() {
        let gateway = MockGateway::new()
            .with_video_outcome(MockVideoOutcome::OperationFailed("blocked".to_string()));
        let op = submit(&gateway).await;

        let err = fast(None).wait(&gateway, &op).await.unwrap_err();
        assert!(matches!(err, GatewayError::OperationFailed(_)));
    }
}
