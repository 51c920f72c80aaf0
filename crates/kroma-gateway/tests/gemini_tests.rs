//! Gemini gateway tests against a mock HTTP server.

use kroma_gateway::{AiGateway, GatewayConfig, GatewayError, GeminiGateway, VideoPoll, VideoRequest};
use kroma_models::AspectRatio;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn gateway(server: &MockServer) -> GeminiGateway {
    let mut config = GatewayConfig::gemini(KEY, server.uri());
    config.max_retries = 0;
    GeminiGateway::new(config).unwrap()
}

fn text_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

#[tokio::test]
async fn test_decompose_script_parses_fenced_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
            "```json\n[{\"description\":\"A cat on a roof\"},{\"description\":\"It flaps its paws\"},{\"description\":\"It soars\"}]\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let scenes = gateway(&server)
        .decompose_script("a cat learns to fly", 3)
        .await
        .unwrap();

    assert_eq!(scenes.len(), 3);
    assert_eq!(scenes[0], "A cat on a roof");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("3-scene"));
    assert!(prompt.contains("a cat learns to fly"));
}

#[tokio::test]
async fn test_decompose_script_falls_back_to_next_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_response("[{\"description\":\"Only scene\"}]")),
        )
        .mount(&server)
        .await;

    let scenes = gateway(&server).decompose_script("topic", 1).await.unwrap();
    assert_eq!(scenes, vec!["Only scene"]);
}

#[tokio::test]
async fn test_decompose_script_unparseable_is_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Sorry, no.")))
        .mount(&server)
        .await;

    let err = gateway(&server).decompose_script("topic", 2).await.unwrap_err();
    assert!(matches!(err, GatewayError::EmptyResult(_)));
}

#[tokio::test]
async fn test_character_image_reads_inline_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-pro-image-preview:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your character" },
                { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
            ] } }]
        })))
        .mount(&server)
        .await;

    let image = gateway(&server)
        .synthesize_character_image("a tabby cat with goggles")
        .await
        .unwrap();
    assert_eq!(image, "aGVsbG8=");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
    assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "1K");
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.starts_with("A full body character design on a neutral background."));
}

#[tokio::test]
async fn test_character_image_without_inline_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("text only")))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .synthesize_character_image("anything")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::EmptyResult(_)));
}

#[tokio::test]
async fn test_video_submit_poll_and_fetch() {
    let server = MockServer::start().await;
    let op_name = "models/veo-3.1-fast-generate-preview/operations/op-1";
    let video_uri = format!("{}/files/clip-1:download?alt=media", server.uri());

    Mock::given(method("POST"))
        .and(path("/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning"))
        .and(query_param("key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": op_name })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{}", op_name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": op_name,
            "done": true,
            "response": { "generateVideoResponse": {
                "generatedSamples": [{ "video": { "uri": video_uri } }]
            } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/clip-1:download"))
        .and(query_param("alt", "media"))
        .and(query_param("key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let request = VideoRequest {
        prompt: "The cat takes off".to_string(),
        reference_image: Some("aGVsbG8=".to_string()),
        aspect_ratio: AspectRatio::Portrait,
    };

    let operation = gateway.submit_video(&request).await.unwrap();
    assert_eq!(operation.name, op_name);

    let poll = gateway.poll_video(&operation).await.unwrap();
    let uri = match poll {
        VideoPoll::Done { video_uri: Some(uri) } => uri,
        other => panic!("unexpected poll result: {:?}", other),
    };

    let bytes = gateway.fetch_video(&uri).await.unwrap();
    assert_eq!(bytes, b"mp4-bytes");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["instances"][0]["prompt"], "The cat takes off");
    assert_eq!(body["instances"][0]["image"]["mimeType"], "image/png");
    assert_eq!(body["instances"][0]["image"]["bytesBase64Encoded"], "aGVsbG8=");
    assert_eq!(body["parameters"]["aspectRatio"], "9:16");
    assert_eq!(body["parameters"]["resolution"], "720p");
}

#[tokio::test]
async fn test_poll_pending_and_operation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/ops/running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "ops/running" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/ops/failed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "ops/failed",
            "done": true,
            "error": { "code": 3, "message": "prompt rejected" }
        })))
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let pending = gateway
        .poll_video(&kroma_gateway::VideoOperation::new("ops/running"))
        .await
        .unwrap();
    assert_eq!(pending, VideoPoll::Pending);

    let err = gateway
        .poll_video(&kroma_gateway::VideoOperation::new("ops/failed"))
        .await
        .unwrap_err();
    match err {
        GatewayError::OperationFailed(msg) => assert!(msg.contains("prompt rejected")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_poll_done_without_samples() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/ops/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "ops/empty",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [] } }
        })))
        .mount(&server)
        .await;

    let poll = gateway(&server)
        .poll_video(&kroma_gateway::VideoOperation::new("ops/empty"))
        .await
        .unwrap();
    assert_eq!(poll, VideoPoll::Done { video_uri: None });
}

#[tokio::test]
async fn test_fetch_video_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .fetch_video(&format!("{}/files/clip?alt=media", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::DownloadFailed(_)));
}

#[tokio::test]
async fn test_request_failed_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .synthesize_character_image("anything")
        .await
        .unwrap_err();
    match err {
        GatewayError::RequestFailed { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad key");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
