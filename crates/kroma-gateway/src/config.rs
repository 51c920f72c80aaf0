//! Gateway configuration.

use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::{GatewayError, GatewayResult};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Which gateway strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Gemini,
    Mock,
}

impl GatewayKind {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Some(GatewayKind::Gemini),
            "mock" => Some(GatewayKind::Mock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Gemini => "gemini",
            GatewayKind::Mock => "mock",
        }
    }
}

/// Configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub kind: GatewayKind,
    pub api_key: Option<String>,
    /// API root, without the `/v1beta` suffix
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Max transport retries per request
    pub max_retries: u32,
    /// Script models, tried in order until one succeeds
    pub script_models: Vec<String>,
    pub image_model: String,
    pub video_model: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Mock,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 2,
            script_models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-flash-lite".to_string(),
            ],
            image_model: IMAGE_MODEL.to_string(),
            video_model: VIDEO_MODEL.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create config from environment variables.
    ///
    /// Without an explicit `KROMA_GATEWAY`, the Gemini strategy is used when
    /// an API key is present and the mock otherwise.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let kind = match std::env::var("KROMA_GATEWAY") {
            Ok(value) => GatewayKind::from_str(&value).unwrap_or_else(|| {
                warn!("Unknown KROMA_GATEWAY '{}', falling back to mock", value);
                GatewayKind::Mock
            }),
            Err(_) if api_key.is_some() => GatewayKind::Gemini,
            Err(_) => GatewayKind::Mock,
        };

        Self {
            kind,
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_retries: std::env::var("GATEWAY_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            ..defaults
        }
    }

    /// Config for the Gemini strategy against a given API root.
    pub fn gemini(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            kind: GatewayKind::Gemini,
            api_key: Some(api_key.into()),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Check that the Gemini strategy can run with this config.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.kind == GatewayKind::Mock {
            return Ok(());
        }
        if self.api_key.is_none() {
            return Err(GatewayError::config("GEMINI_API_KEY not set"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| GatewayError::config(format!("Invalid GEMINI_BASE_URL: {}", e)))?;
        if self.script_models.is_empty() {
            return Err(GatewayError::config("No script models configured"));
        }
        Ok(())
    }
}
