//! Gemini REST client.
//!
//! Talks to the Gemini `v1beta` API for the three synthesis kinds:
//! - `generateContent` with a JSON response schema for script decomposition
//! - `generateContent` with an image config for the character reference
//! - `predictLongRunning` on the Veo model for scene video, polled through
//!   the operations endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::AiGateway;
use crate::types::{VideoOperation, VideoPoll, VideoRequest};

const CHARACTER_PROMPT_PREFIX: &str = "A full body character design on a neutral background.";

/// Upper bound for the delay between retried requests.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// `generateContent` request.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(rename = "imageConfig", skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
    #[serde(rename = "imageSize")]
    image_size: String,
}

/// `generateContent` response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Deserialize)]
struct ScriptScene {
    description: String,
}

/// `predictLongRunning` request.
#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImageInput>,
}

#[derive(Debug, Serialize)]
struct ImageInput {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Serialize)]
struct VideoParameters {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
    resolution: String,
    #[serde(rename = "sampleCount")]
    sample_count: u32,
}

/// Long-running operation resource.
#[derive(Debug, Deserialize)]
struct OperationResource {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationStatus>,
    response: Option<OperationResult>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationResult {
    #[serde(rename = "generateVideoResponse")]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
struct GenerateVideoResponse {
    #[serde(rename = "generatedSamples", default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

impl OperationResource {
    fn video_uri(self) -> Option<String> {
        self.response?
            .generate_video_response?
            .generated_samples
            .into_iter()
            .next()?
            .video?
            .uri
            .filter(|u| !u.is_empty())
    }
}

/// Gemini gateway strategy.
pub struct GeminiGateway {
    http: Client,
    api_key: String,
    config: GatewayConfig,
}

impl GeminiGateway {
    /// Create a new Gemini gateway.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GatewayError::config("GEMINI_API_KEY not set"))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GatewayError::Network)?;

        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn build_script_prompt(topic: &str, scene_count: u32) -> String {
        format!(
            r#"You are a professional video director. Create a {scene_count}-scene video script for a video about: "{topic}".
Return a JSON array of scenes. Each scene needs a visual description suitable for video generation.
Keep descriptions concise (under 40 words) and visually descriptive."#
        )
    }

    fn script_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "description": { "type": "STRING" }
                },
                "required": ["description"]
            }
        })
    }

    /// POST a JSON body and decode the JSON answer.
    async fn post_json<B, T>(&self, url: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(body)
                    .send()
                    .await?;
                check_status(response).await
            })
            .await?;

        Ok(response.json().await?)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> GatewayResult<GenerateResponse> {
        let url = self.api_url(&format!("models/{}:generateContent", model));
        debug!("Calling Gemini generateContent with model {}", model);
        self.post_json(&url, request).await
    }

    async fn decompose_with_model(
        &self,
        model: &str,
        topic: &str,
        scene_count: u32,
    ) -> GatewayResult<Vec<String>> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Self::build_script_prompt(topic, scene_count),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(Self::script_schema()),
                ..Default::default()
            },
        };

        let response = self.generate_content(model, &request).await?;
        let text = response
            .parts()
            .find_map(|p| p.text.as_deref())
            .ok_or_else(|| GatewayError::empty_result("No script generated"))?;

        parse_script(text)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> GatewayResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = GatewayResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "Gemini request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| GatewayError::config("Retry loop ran zero times")))
    }
}

/// 500 ms doubled per attempt, capped at [`MAX_BACKOFF`].
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500)
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

/// Turn a non-success response into `RequestFailed`.
async fn check_status(response: Response) -> GatewayResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::RequestFailed { status, body })
}

/// Strip an optional markdown code fence around a JSON payload.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse the script model's JSON array of `{ "description": ... }`.
fn parse_script(text: &str) -> GatewayResult<Vec<String>> {
    let scenes: Vec<ScriptScene> = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        GatewayError::empty_result(format!("Failed to parse script generation response: {}", e))
    })?;
    Ok(scenes.into_iter().map(|s| s.description).collect())
}

#[async_trait]
impl AiGateway for GeminiGateway {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn decompose_script(&self, topic: &str, scene_count: u32) -> GatewayResult<Vec<String>> {
        let mut last_error = None;

        for model in &self.config.script_models {
            info!("Attempting script decomposition with model: {}", model);
            match self.decompose_with_model(model, topic, scene_count).await {
                Ok(scenes) => {
                    info!("Got {} scenes from {}", scenes.len(), model);
                    return Ok(scenes);
                }
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GatewayError::config("No script models configured")))
    }

    async fn synthesize_character_image(&self, prompt: &str) -> GatewayResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{} {}", CHARACTER_PROMPT_PREFIX, prompt),
                }],
            }],
            generation_config: GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: "1:1".to_string(),
                    image_size: "1K".to_string(),
                }),
                ..Default::default()
            },
        };

        let response = self
            .generate_content(&self.config.image_model, &request)
            .await?;

        let image = response
            .parts()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.clone())
            .find(|data| !data.is_empty());
        image.ok_or_else(|| GatewayError::empty_result("No image generated"))
    }

    async fn submit_video(&self, request: &VideoRequest) -> GatewayResult<VideoOperation> {
        let body = PredictRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt.clone(),
                image: request.reference_image.as_ref().map(|img| ImageInput {
                    bytes_base64_encoded: img.clone(),
                    mime_type: "image/png".to_string(),
                }),
            }],
            parameters: VideoParameters {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                resolution: "720p".to_string(),
                sample_count: 1,
            },
        };

        let url = self.api_url(&format!(
            "models/{}:predictLongRunning",
            self.config.video_model
        ));
        let operation: OperationResource = self.post_json(&url, &body).await?;

        info!(
            operation = %operation.name,
            with_reference = request.reference_image.is_some(),
            "Submitted video generation"
        );
        Ok(VideoOperation::new(operation.name))
    }

    async fn poll_video(&self, operation: &VideoOperation) -> GatewayResult<VideoPoll> {
        let url = self.api_url(&operation.name);

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .get(&url)
                    .query(&[("key", self.api_key.as_str())])
                    .send()
                    .await?;
                check_status(response).await
            })
            .await?;
        let resource: OperationResource = response.json().await?;

        if let Some(status) = resource.error.as_ref() {
            return Err(GatewayError::operation_failed(format!(
                "{} (code {})",
                status.message, status.code
            )));
        }
        if !resource.done {
            debug!(operation = %operation.name, "Video operation still running");
            return Ok(VideoPoll::Pending);
        }

        Ok(VideoPoll::Done {
            video_uri: resource.video_uri(),
        })
    }

    async fn fetch_video(&self, uri: &str) -> GatewayResult<Vec<u8>> {
        let response = self
            .http
            .get(uri)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GatewayError::download_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::download_failed(format!(
                "Failed to download video file: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::download_failed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(GatewayError::download_failed("Downloaded video is empty"));
        }

        debug!("Downloaded {} bytes of video", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(10), MAX_BACKOFF);
        assert_eq!(backoff_delay(64), MAX_BACKOFF);
        assert_eq!(backoff_delay(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  [1] "), "[1]");
    }

    #[test]
    fn test_parse_script() {
        let text = r#"[{"description":"A cat on a roof"},{"description":"It jumps"}]"#;
        let scenes = parse_script(text).unwrap();
        assert_eq!(scenes, vec!["A cat on a roof", "It jumps"]);
    }

    #[test]
    fn test_parse_script_rejects_prose() {
        let err = parse_script("Here is your script!").unwrap_err();
        assert!(matches!(err, GatewayError::EmptyResult(_)));
    }

    #[test]
    fn test_operation_video_uri() {
        let json = r#"{
            "name": "models/veo/operations/1",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{ "video": { "uri": "https://files/v1?alt=media" } }]
                }
            }
        }"#;
        let op: OperationResource = serde_json::from_str(json).unwrap();
        assert_eq!(op.video_uri().as_deref(), Some("https://files/v1?alt=media"));
    }

    #[test]
    fn test_operation_without_samples() {
        let json = r#"{ "name": "op", "done": true, "response": {} }"#;
        let op: OperationResource = serde_json::from_str(json).unwrap();
        assert!(op.video_uri().is_none());
    }

    #[test]
    fn test_predict_request_wire_shape() {
        let body = PredictRequest {
            instances: vec![VideoInstance {
                prompt: "A cat".to_string(),
                image: None,
            }],
            parameters: VideoParameters {
                aspect_ratio: "9:16".to_string(),
                resolution: "720p".to_string(),
                sample_count: 1,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value["instances"][0].get("image").is_none());
        assert_eq!(value["parameters"]["aspectRatio"], "9:16");
        assert_eq!(value["parameters"]["resolution"], "720p");
    }
}
