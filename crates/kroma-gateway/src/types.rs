//! Request and response types for two-phase video synthesis.

use kroma_models::AspectRatio;
use serde::{Deserialize, Serialize};

/// Input for one scene render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    /// Scene description used as the text prompt
    pub prompt: String,
    /// Base64 PNG anchoring the character; `None` renders text-only
    pub reference_image: Option<String>,
    pub aspect_ratio: AspectRatio,
}

/// Handle to a long-running video operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOperation {
    /// Fully-qualified operation name, e.g. `models/<model>/operations/<id>`
    pub name: String,
}

impl VideoOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoPoll {
    Pending,
    Done { video_uri: Option<String> },
}

impl VideoPoll {
    pub fn is_done(&self) -> bool {
        matches!(self, VideoPoll::Done { .. })
    }
}
