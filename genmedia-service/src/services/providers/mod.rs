//! Generative-AI provider abstractions and implementations.
//!
//! The service talks to its provider only through [`ProviderGateway`]: text
//! generation, image generation, image Q&A and the submit/poll/download
//! contract of long-running video operations. A gateway carries its own
//! credential and is built per request by a [`GatewayFactory`].

pub mod gemini;
pub mod mock;
pub mod veo;

use crate::models::{AspectRatio, ErrorKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Error type for provider operations.
///
/// Gateways build these from the provider's structured error signal (HTTP
/// status, API status name, error reasons), never from message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid API key: {0}")]
    InvalidCredentials(String),

    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Kind of a terminal error: retrying the same request cannot succeed.
    ///
    /// Returns `None` for transient or unclassified failures, which the
    /// orchestrator answers with a fallback plan.
    pub fn terminal_kind(&self) -> Option<ErrorKind> {
        match self {
            ProviderError::NotConfigured(_) | ProviderError::InvalidCredentials(_) => {
                Some(ErrorKind::CredentialError)
            }
            ProviderError::Unauthenticated(_) => Some(ErrorKind::AuthenticationError),
            ProviderError::RateLimited(_) => Some(ErrorKind::QuotaExceededError),
            ProviderError::InvalidRequest(_) | ProviderError::ContentFiltered(_) => {
                Some(ErrorKind::ValidationError)
            }
            ProviderError::NetworkError(_)
            | ProviderError::ApiError { .. }
            | ProviderError::InvalidResponse(_) => None,
        }
    }

    /// Kind reported to a caller when the error is surfaced directly.
    pub fn kind(&self) -> ErrorKind {
        match (self.terminal_kind(), self) {
            (Some(kind), _) => kind,
            (None, ProviderError::NetworkError(_)) => ErrorKind::NetworkError,
            (None, _) => ErrorKind::UnknownError,
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::InvalidCredentials(_) => "invalid_credentials",
            ProviderError::Unauthenticated(_) => "unauthenticated",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::ContentFiltered(_) => "content_filtered",
            ProviderError::NetworkError(_) => "network",
            ProviderError::ApiError { .. } => "api",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Whether people may appear in generated video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonGeneration {
    Disallow,
    AllowAdult,
}

impl PersonGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonGeneration::Disallow => "dont_allow",
            PersonGeneration::AllowAdult => "allow_adult",
        }
    }
}

/// Output constraints of a video submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub aspect_ratio: AspectRatio,
    pub number_of_videos: u32,
    pub duration_seconds: u32,
    pub negative_prompt: String,
    pub person_generation: PersonGeneration,
}

/// Output constraints of an image generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConstraints {
    pub aspect_ratio: AspectRatio,
    pub number_of_images: u32,
}

/// Image bytes sent inline with a request.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Reference to a finished output, retrievable with [`ProviderGateway::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub uri: String,
    pub mime_type: Option<String>,
}

/// How a finished operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Completed; the list may be empty when the provider produced nothing.
    Outputs(Vec<OutputRef>),
    /// Completed with a provider-side error.
    Failed(ProviderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Done(OperationOutcome),
}

/// Opaque provider token for a long-running job plus its last known status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
    pub status: OperationStatus,
}

impl OperationHandle {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: OperationStatus::Pending,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, OperationStatus::Done(_))
    }
}

/// Contract of the external generative-AI provider.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Short provider name used in artifact file names (e.g. `veo`).
    fn video_provider(&self) -> &str;

    /// Short name of the image generator used in preview file names.
    fn image_provider(&self) -> &str;

    /// Model that renders videos, reported back to callers.
    fn video_model(&self) -> &str;

    /// Start a video generation job.
    async fn submit(
        &self,
        prompt: &str,
        media: Option<&InlineImage>,
        constraints: &VideoConstraints,
    ) -> Result<OperationHandle, ProviderError>;

    /// Fetch the current status of a job.
    async fn poll(&self, handle: &OperationHandle) -> Result<OperationHandle, ProviderError>;

    /// Retrieve the bytes of a finished output.
    async fn download(&self, output: &OutputRef) -> Result<Vec<u8>, ProviderError>;

    /// Single-turn text generation.
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Generate still images; returns one byte buffer per image.
    async fn generate_image(
        &self,
        prompt: &str,
        constraints: &ImageConstraints,
    ) -> Result<Vec<Vec<u8>>, ProviderError>;

    /// Answer a question about an image with the given (or default) text model.
    async fn answer_about_image(
        &self,
        question: &str,
        image: &InlineImage,
        model: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Verify the credential works.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Builds a gateway bound to one credential.
pub trait GatewayFactory: Send + Sync {
    /// `api_key` is the caller-supplied key; `None` selects the configured one.
    fn gateway(&self, api_key: Option<&str>) -> Result<Arc<dyn ProviderGateway>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_errors_are_terminal() {
        assert_eq!(
            ProviderError::InvalidCredentials("API key not valid".into()).terminal_kind(),
            Some(ErrorKind::CredentialError)
        );
        assert_eq!(
            ProviderError::RateLimited("RESOURCE_EXHAUSTED".into()).terminal_kind(),
            Some(ErrorKind::QuotaExceededError)
        );
        assert_eq!(
            ProviderError::Unauthenticated("UNAUTHENTICATED".into()).terminal_kind(),
            Some(ErrorKind::AuthenticationError)
        );
    }

    #[test]
    fn transient_errors_are_not_terminal_but_still_have_a_kind() {
        let network = ProviderError::NetworkError("connection reset".into());
        assert_eq!(network.terminal_kind(), None);
        assert_eq!(network.kind(), ErrorKind::NetworkError);

        let api = ProviderError::ApiError {
            status: 503,
            message: "backend unavailable".into(),
        };
        assert_eq!(api.terminal_kind(), None);
        assert_eq!(api.kind(), ErrorKind::UnknownError);
    }

    #[test]
    fn person_generation_uses_wire_values() {
        assert_eq!(PersonGeneration::Disallow.as_str(), "dont_allow");
    }
}
