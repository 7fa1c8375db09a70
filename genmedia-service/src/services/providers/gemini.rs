//! Gemini API gateway.
//!
//! Text generation and image Q&A go through `generateContent`, preview stills
//! through the Imagen `predict` method and videos through Veo's
//! `predictLongRunning` operations (see [`super::veo`]).

use super::veo::{Operation, PredictLongRunningRequest};
use super::{
    GatewayFactory, ImageConstraints, InlineImage, OperationHandle, OutputRef, ProviderError,
    ProviderGateway, VideoConstraints,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use service_core::observability::{TracedClientExt, TracedRequest};
use std::sync::Arc;
use std::time::Duration;

/// Default Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Video files can be large; give downloads more room than API calls.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: String,
    pub text_model: String,
    pub video_model: String,
    pub image_model: String,
}

/// Gateway to the Gemini, Veo and Imagen REST APIs for one API key.
pub struct GeminiGateway {
    config: GeminiConfig,
    client: Client,
}

impl GeminiGateway {
    pub fn new(config: GeminiConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Build the API URL for the given model and method.
    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.api_base, model, method)
    }

    fn post(&self, url: &str) -> TracedRequest {
        self.client
            .traced_post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
    }

    fn get(&self, url: &str) -> TracedRequest {
        self.client
            .traced_get(url)
            .header(API_KEY_HEADER, &self.config.api_key)
    }

    /// Send a request and turn non-2xx answers into classified errors.
    async fn send(&self, request: TracedRequest) -> Result<reqwest::Response, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_http_error(status, &body))
    }

    async fn generate_content(
        &self,
        model: &str,
        parts: Vec<ContentPart>,
    ) -> Result<String, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        };

        tracing::debug!(model = %model, "Sending generateContent request to Gemini API");

        let response = self
            .send(self.post(&self.model_url(model, "generateContent")).json(&request))
            .await?;

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("generateContent: {}", e)))?;

        let candidate = api_response.candidates.into_iter().next().ok_or_else(|| {
            match api_response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
            {
                Some(reason) => ProviderError::ContentFiltered(reason),
                None => ProviderError::InvalidResponse("no candidates returned".to_string()),
            }
        })?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::ContentFiltered(
                "response blocked by safety settings".to_string(),
            ));
        }

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text),
                ContentPart::InlineData { .. } => None,
            })
            .collect();

        Ok(text)
    }
}

#[async_trait]
impl ProviderGateway for GeminiGateway {
    fn video_provider(&self) -> &str {
        "veo"
    }

    fn image_provider(&self) -> &str {
        "imagen"
    }

    fn video_model(&self) -> &str {
        &self.config.video_model
    }

    async fn submit(
        &self,
        prompt: &str,
        media: Option<&InlineImage>,
        constraints: &VideoConstraints,
    ) -> Result<OperationHandle, ProviderError> {
        let request = PredictLongRunningRequest::new(prompt, media, constraints);
        let url = self.model_url(&self.config.video_model, "predictLongRunning");

        tracing::debug!(
            model = %self.config.video_model,
            prompt_len = prompt.len(),
            image_conditioned = media.is_some(),
            "Submitting video operation"
        );

        let response = self.send(self.post(&url).json(&request)).await?;
        let operation: Operation = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("predictLongRunning: {}", e)))?;

        Ok(operation.into_handle())
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationHandle, ProviderError> {
        let url = format!("{}/{}", self.config.api_base, handle.name);
        let response = self.send(self.get(&url)).await?;
        let operation: Operation = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("operation status: {}", e)))?;

        Ok(operation.into_handle())
    }

    async fn download(&self, output: &OutputRef) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .send(self.get(&output.uri).timeout(DOWNLOAD_TIMEOUT))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate_content(
            &self.config.text_model,
            vec![ContentPart::Text {
                text: prompt.to_string(),
            }],
        )
        .await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        constraints: &ImageConstraints,
    ) -> Result<Vec<Vec<u8>>, ProviderError> {
        let request = PredictRequest {
            instances: vec![PromptInstance { prompt }],
            parameters: ImageParameters {
                sample_count: constraints.number_of_images,
                aspect_ratio: constraints.aspect_ratio.as_str(),
            },
        };
        let url = self.model_url(&self.config.image_model, "predict");

        let response = self.send(self.post(&url).json(&request)).await?;
        let prediction: PredictResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("predict: {}", e)))?;

        prediction
            .predictions
            .into_iter()
            .filter_map(|p| p.bytes_base64_encoded)
            .map(|encoded| {
                BASE64
                    .decode(encoded)
                    .map_err(|e| ProviderError::InvalidResponse(format!("image bytes: {}", e)))
            })
            .collect()
    }

    async fn answer_about_image(
        &self,
        question: &str,
        image: &InlineImage,
        model: Option<&str>,
    ) -> Result<String, ProviderError> {
        let model = model.unwrap_or(&self.config.text_model);
        let parts = vec![
            ContentPart::Text {
                text: question.to_string(),
            },
            ContentPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: BASE64.encode(&image.bytes),
                },
            },
        ];

        self.generate_content(model, parts).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let url = format!("{}/models", self.config.api_base);
        self.send(self.get(&url)).await.map(|_| ())
    }
}

/// Builds [`GeminiGateway`]s sharing one HTTP client.
pub struct GeminiGatewayFactory {
    template: GeminiConfig,
    client: Client,
}

impl GeminiGatewayFactory {
    /// `template.api_key` is the default credential and may be empty.
    pub fn new(template: GeminiConfig, client: Client) -> Self {
        Self { template, client }
    }
}

impl GatewayFactory for GeminiGatewayFactory {
    fn gateway(&self, api_key: Option<&str>) -> Result<Arc<dyn ProviderGateway>, ProviderError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(&self.template.api_key);

        if api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "No API key supplied and none configured".to_string(),
            ));
        }

        let config = GeminiConfig {
            api_key: api_key.to_string(),
            ..self.template.clone()
        };
        Ok(Arc::new(GeminiGateway::new(config, self.client.clone())))
    }
}

// ============================================================================
// Error classification
// ============================================================================

/// Google API error status (`{"error": {...}}` bodies and operation errors).
#[derive(Debug, Deserialize, Default)]
pub(super) struct GoogleStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleStatus,
}

impl GoogleStatus {
    fn has_reason(&self, reason: &str) -> bool {
        self.details
            .iter()
            .any(|d| d.reason.as_deref() == Some(reason))
    }

    /// Map to a [`ProviderError`]. `http_status` is absent for operation errors,
    /// whose `code` is a gRPC status code.
    pub(super) fn into_provider_error(self, http_status: Option<u16>) -> ProviderError {
        let api_status = self
            .status
            .clone()
            .or_else(|| grpc_status_name(self.code).map(str::to_string))
            .unwrap_or_default();
        let message = if self.message.is_empty() {
            api_status.clone()
        } else {
            self.message.clone()
        };

        if self.has_reason("API_KEY_INVALID") || self.has_reason("API_KEY_EXPIRED") {
            return ProviderError::InvalidCredentials(message);
        }

        match (http_status, api_status.as_str()) {
            (Some(401), _) | (_, "UNAUTHENTICATED") => ProviderError::Unauthenticated(message),
            (Some(403), _) | (_, "PERMISSION_DENIED") => ProviderError::Unauthenticated(message),
            (Some(429), _) | (_, "RESOURCE_EXHAUSTED") => ProviderError::RateLimited(message),
            (Some(400), _) | (_, "INVALID_ARGUMENT") | (_, "FAILED_PRECONDITION") => {
                ProviderError::InvalidRequest(message)
            }
            (Some(status), _) => ProviderError::ApiError { status, message },
            (None, _) => ProviderError::ApiError {
                status: 500,
                message,
            },
        }
    }
}

fn grpc_status_name(code: i32) -> Option<&'static str> {
    match code {
        3 => Some("INVALID_ARGUMENT"),
        7 => Some("PERMISSION_DENIED"),
        8 => Some("RESOURCE_EXHAUSTED"),
        9 => Some("FAILED_PRECONDITION"),
        16 => Some("UNAUTHENTICATED"),
        _ => None,
    }
}

/// Classify a non-2xx HTTP answer from the provider.
pub(super) fn classify_http_error(status: StatusCode, body: &str) -> ProviderError {
    let google_status = serde_json::from_str::<GoogleErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| GoogleStatus {
            code: i32::from(status.as_u16()),
            message: body.chars().take(512).collect(),
            ..Default::default()
        });

    google_status.into_provider_error(Some(status.as_u16()))
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PromptInstance<'a>>,
    parameters: ImageParameters<'a>,
}

#[derive(Debug, Serialize)]
struct PromptInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageParameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AspectRatio;
    use crate::services::providers::{OperationOutcome, OperationStatus, PersonGeneration};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> GeminiGateway {
        GeminiGateway::new(
            GeminiConfig {
                api_key: "test-key".to_string(),
                api_base: server.uri(),
                text_model: "gemini-2.0-flash".to_string(),
                video_model: "veo-2.0-generate-001".to_string(),
                image_model: "imagen-3.0-generate-002".to_string(),
            },
            Client::new(),
        )
    }

    fn constraints() -> VideoConstraints {
        VideoConstraints {
            aspect_ratio: AspectRatio::Landscape,
            number_of_videos: 1,
            duration_seconds: 8,
            negative_prompt: "ugly, low quality, blurry, distorted".to_string(),
            person_generation: PersonGeneration::Disallow,
        }
    }

    #[test]
    fn invalid_api_key_body_maps_to_credentials_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID"}]}}"#;
        let err = classify_http_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, ProviderError::InvalidCredentials(ref m) if m.contains("API key not valid")));
    }

    #[test]
    fn resource_exhausted_maps_to_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify_http_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(err, ProviderError::RateLimited(_)));
    }

    #[test]
    fn unparseable_server_error_is_transient() {
        let err = classify_http_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert_eq!(err.terminal_kind(), None);
        assert!(matches!(err, ProviderError::ApiError { status: 502, .. }));
    }

    #[tokio::test]
    async fn generate_text_joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hello"}, {"text": " world"}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let text = gateway(&server).generate_text("say hello").await.unwrap();
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn submit_sends_constraints_and_returns_pending_handle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/veo-2.0-generate-001:predictLongRunning"))
            .and(body_partial_json(serde_json::json!({
                "instances": [{"prompt": "a cat on a roof"}],
                "parameters": {
                    "aspectRatio": "16:9",
                    "personGeneration": "dont_allow",
                    "sampleCount": 1,
                    "durationSeconds": 8
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "models/veo-2.0-generate-001/operations/op123"
            })))
            .mount(&server)
            .await;

        let handle = gateway(&server)
            .submit("a cat on a roof", None, &constraints())
            .await
            .unwrap();
        assert_eq!(handle.name, "models/veo-2.0-generate-001/operations/op123");
        assert_eq!(handle.status, OperationStatus::Pending);
    }

    #[tokio::test]
    async fn submit_with_rejected_key_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT",
                    "details": [{"reason": "API_KEY_INVALID"}]
                }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .submit("a cat", None, &constraints())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn poll_reads_generated_samples() {
        let server = MockServer::start().await;
        let video_uri = format!("{}/files/abc:download?alt=media", server.uri());
        Mock::given(method("GET"))
            .and(path("/models/veo-2.0-generate-001/operations/op123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "models/veo-2.0-generate-001/operations/op123",
                "done": true,
                "response": {
                    "generateVideoResponse": {
                        "generatedSamples": [{"video": {"uri": video_uri}}]
                    }
                }
            })))
            .mount(&server)
            .await;

        let handle = OperationHandle::pending("models/veo-2.0-generate-001/operations/op123");
        let refreshed = gateway(&server).poll(&handle).await.unwrap();
        match refreshed.status {
            OperationStatus::Done(OperationOutcome::Outputs(outputs)) => {
                assert_eq!(outputs.len(), 1);
                assert_eq!(outputs[0].uri, video_uri);
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn download_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/abc:download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
            .mount(&server)
            .await;

        let output = OutputRef {
            uri: format!("{}/files/abc:download?alt=media", server.uri()),
            mime_type: Some("video/mp4".to_string()),
        };
        let bytes = gateway(&server).download(&output).await.unwrap();
        assert_eq!(bytes.len(), 64);
    }

    #[tokio::test]
    async fn generate_image_decodes_predictions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/imagen-3.0-generate-002:predict"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {"sampleCount": 1, "aspectRatio": "16:9"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{"bytesBase64Encoded": BASE64.encode(b"png-bytes"), "mimeType": "image/png"}]
            })))
            .mount(&server)
            .await;

        let images = gateway(&server)
            .generate_image(
                "a cat",
                &ImageConstraints {
                    aspect_ratio: AspectRatio::Landscape,
                    number_of_images: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(images, vec![b"png-bytes".to_vec()]);
    }

    #[test]
    fn factory_prefers_caller_key_and_requires_one() {
        let template = GeminiConfig {
            api_key: String::new(),
            api_base: GEMINI_API_BASE.to_string(),
            text_model: "t".to_string(),
            video_model: "v".to_string(),
            image_model: "i".to_string(),
        };
        let factory = GeminiGatewayFactory::new(template, Client::new());

        assert!(matches!(
            factory.gateway(None).err(),
            Some(ProviderError::NotConfigured(_))
        ));
        assert!(factory.gateway(Some("caller-key")).is_ok());
    }
}
