//! JSON shapes of the three generation outcomes.

use super::error::ApiError;
use crate::models::{
    ErrorKind, FallbackPlan, FallbackReason, GeneratedArtifact, GenerationResult,
    GenerationSuccess, RequestEcho, VideoOutput,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ArtifactDto {
    pub file_name: String,
    pub path: String,
    pub size_bytes: u64,
}

impl From<&GeneratedArtifact> for ArtifactDto {
    fn from(artifact: &GeneratedArtifact) -> Self {
        Self {
            file_name: artifact.file_name.clone(),
            path: artifact.public_path.clone(),
            size_bytes: artifact.size_bytes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimingDto {
    pub elapsed_secs: f64,
    pub waited_secs: u64,
    pub polls: u32,
}

/// The provider produced a video but it could not be kept locally.
#[derive(Debug, Serialize)]
pub struct PersistenceNote {
    pub error_type: ErrorKind,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoGeneratedResponse {
    pub success: bool,
    pub status: &'static str,
    pub message: String,
    pub request: RequestEcho,
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub video: Option<ArtifactDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<PersistenceNote>,
    pub preview_image: Option<String>,
    pub model: String,
    pub timing: TimingDto,
}

impl From<GenerationSuccess> for VideoGeneratedResponse {
    fn from(success: GenerationSuccess) -> Self {
        let (video, persistence_error, message) = match &success.output {
            VideoOutput::Stored(artifact) => (
                Some(ArtifactDto::from(artifact)),
                None,
                "Video generated".to_string(),
            ),
            VideoOutput::NotStored { remote_uri, error } => (
                None,
                Some(PersistenceNote {
                    error_type: ErrorKind::PersistenceError,
                    error: error.clone(),
                    remote_uri: remote_uri.clone(),
                }),
                "Video generated but could not be saved locally".to_string(),
            ),
        };

        Self {
            success: true,
            status: "completed",
            message,
            original_prompt: success.optimized.original.clone(),
            optimized_prompt: success.optimized.optimized.clone(),
            request: success.request,
            video,
            persistence_error,
            preview_image: success.preview_image.map(|p| p.public_path),
            model: success.model,
            timing: TimingDto {
                elapsed_secs: success.timing.elapsed.as_secs_f64(),
                waited_secs: success.timing.waited.as_secs(),
                polls: success.timing.polls,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FallbackReasonDto {
    Timeout { waited_secs: u64, polls: u32 },
    ProviderUnavailable { detail: String },
}

impl From<FallbackReason> for FallbackReasonDto {
    fn from(reason: FallbackReason) -> Self {
        match reason {
            FallbackReason::Timeout { waited, polls } => FallbackReasonDto::Timeout {
                waited_secs: waited.as_secs(),
                polls,
            },
            FallbackReason::ProviderUnavailable(detail) => {
                FallbackReasonDto::ProviderUnavailable { detail }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanGeneratedResponse {
    pub success: bool,
    pub status: &'static str,
    pub message: String,
    pub video_plan: String,
    pub preview_image: Option<String>,
    pub request: RequestEcho,
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub reason: FallbackReasonDto,
    pub note: &'static str,
}

impl From<FallbackPlan> for PlanGeneratedResponse {
    fn from(plan: FallbackPlan) -> Self {
        let message = match &plan.reason {
            FallbackReason::Timeout { .. } => {
                "Video generation did not finish in time; a production plan was generated instead"
            }
            FallbackReason::ProviderUnavailable(_) => {
                "The video model is unavailable; a production plan was generated instead"
            }
        };
        Self {
            success: true,
            status: "plan_generated",
            message: message.to_string(),
            video_plan: plan.text_plan,
            preview_image: plan.preview_image.map(|p| p.public_path),
            original_prompt: plan.request.prompt.clone(),
            request: plan.request,
            optimized_prompt: plan.optimized_prompt,
            reason: plan.reason.into(),
            note: "Use the plan with video production software to realise the video",
        }
    }
}

/// HTTP rendering of a [`GenerationResult`].
pub struct GenerationResponse(pub GenerationResult);

impl IntoResponse for GenerationResponse {
    fn into_response(self) -> Response {
        match self.0 {
            GenerationResult::Success(success) => {
                (StatusCode::OK, Json(VideoGeneratedResponse::from(*success))).into_response()
            }
            GenerationResult::PlanFallback(plan) => {
                (StatusCode::OK, Json(PlanGeneratedResponse::from(*plan))).into_response()
            }
            GenerationResult::Error(err) => ApiError::Generation(err).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactKind, GenerationRequest, GenerationTiming, OptimizedPrompt};
    use std::time::Duration;

    fn success(output: VideoOutput) -> GenerationSuccess {
        GenerationSuccess {
            request: GenerationRequest::new("a kite").echo(),
            optimized: OptimizedPrompt {
                original: "a kite".into(),
                optimized: "A red kite over green hills".into(),
            },
            output,
            preview_image: None,
            timing: GenerationTiming {
                elapsed: Duration::from_millis(1500),
                waited: Duration::from_secs(20),
                polls: 1,
            },
            model: "veo-2.0-generate-001".into(),
        }
    }

    #[test]
    fn stored_video_reports_public_path() {
        let body = serde_json::to_value(VideoGeneratedResponse::from(success(VideoOutput::Stored(
            GeneratedArtifact {
                kind: ArtifactKind::Video,
                file_name: "veo_video_1_abcdef01.mp4".into(),
                local_path: "/tmp/veo_video_1_abcdef01.mp4".into(),
                public_path: "storage/generated/veo_video_1_abcdef01.mp4".into(),
                size_bytes: 42,
                source_prompt: "a kite".into(),
            },
        ))))
        .unwrap();

        assert_eq!(body["status"], "completed");
        assert_eq!(body["video"]["path"], "storage/generated/veo_video_1_abcdef01.mp4");
        assert_eq!(body["original_prompt"], "a kite");
        assert_eq!(body["timing"]["polls"], 1);
        assert!(body.get("persistence_error").is_none());
    }

    #[test]
    fn unsaved_video_carries_persistence_note() {
        let body = serde_json::to_value(VideoGeneratedResponse::from(success(
            VideoOutput::NotStored {
                remote_uri: Some("https://example.invalid/v".into()),
                error: "disk full".into(),
            },
        )))
        .unwrap();

        assert!(body["video"].is_null());
        assert_eq!(body["persistence_error"]["error_type"], "persistence_error");
    }

    #[test]
    fn timeout_reason_is_tagged() {
        let reason = serde_json::to_value(FallbackReasonDto::from(FallbackReason::Timeout {
            waited: Duration::from_secs(600),
            polls: 30,
        }))
        .unwrap();

        assert_eq!(reason["type"], "timeout");
        assert_eq!(reason["polls"], 30);
    }
}
