use super::request::RequestEcho;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// What kind of binary an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Video,
    Image,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "video",
            ArtifactKind::Image => "image",
        }
    }
}

/// A binary output persisted to the local content directory.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub local_path: PathBuf,
    /// Path clients fetch the artifact from, e.g. `storage/generated/x.mp4`.
    pub public_path: String,
    pub size_bytes: u64,
    pub source_prompt: String,
}

/// The caller's prompt and the provider-tuned rewrite sent in its place.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OptimizedPrompt {
    pub original: String,
    pub optimized: String,
}

impl OptimizedPrompt {
    /// Mapping used when optimization is skipped or fails.
    pub fn identity(prompt: &str) -> Self {
        Self {
            original: prompt.to_string(),
            optimized: prompt.to_string(),
        }
    }

    pub fn was_rewritten(&self) -> bool {
        self.original != self.optimized
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationTiming {
    /// Wall-clock time from validation to result.
    pub elapsed: Duration,
    /// Time spent sleeping between status checks.
    pub waited: Duration,
    pub polls: u32,
}

/// Where the generated video ended up.
#[derive(Debug, Clone)]
pub enum VideoOutput {
    Stored(GeneratedArtifact),
    /// The provider finished but the bytes could not be downloaded or written.
    NotStored {
        remote_uri: Option<String>,
        error: String,
    },
}

impl VideoOutput {
    pub fn artifact(&self) -> Option<&GeneratedArtifact> {
        match self {
            VideoOutput::Stored(artifact) => Some(artifact),
            VideoOutput::NotStored { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSuccess {
    pub request: RequestEcho,
    pub optimized: OptimizedPrompt,
    pub output: VideoOutput,
    pub preview_image: Option<GeneratedArtifact>,
    pub timing: GenerationTiming,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The poll ceiling was reached before the operation finished.
    Timeout { waited: Duration, polls: u32 },
    /// Submission or polling failed with a transient provider error.
    ProviderUnavailable(String),
}

/// Textual substitute deliverable for a video that could not be produced.
#[derive(Debug, Clone)]
pub struct FallbackPlan {
    pub text_plan: String,
    pub preview_image: Option<GeneratedArtifact>,
    pub request: RequestEcho,
    pub optimized_prompt: String,
    pub reason: FallbackReason,
}

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "validation_error")]
    ValidationError,
    #[serde(rename = "api_key_invalid")]
    CredentialError,
    #[serde(rename = "authentication_failed")]
    AuthenticationError,
    #[serde(rename = "quota_exceeded")]
    QuotaExceededError,
    #[serde(rename = "network_error")]
    NetworkError,
    #[serde(rename = "provider_timeout")]
    ProviderTimeoutError,
    #[serde(rename = "persistence_error")]
    PersistenceError,
    #[serde(rename = "unknown_error")]
    UnknownError,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::CredentialError => "api_key_invalid",
            ErrorKind::AuthenticationError => "authentication_failed",
            ErrorKind::QuotaExceededError => "quota_exceeded",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::ProviderTimeoutError => "provider_timeout",
            ErrorKind::PersistenceError => "persistence_error",
            ErrorKind::UnknownError => "unknown_error",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// Remediation shown next to the error, where one exists.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorKind::CredentialError => {
                Some("Check that the Google API key is valid and has not expired")
            }
            ErrorKind::AuthenticationError => Some("Check the API key sent in X-API-Key"),
            ErrorKind::QuotaExceededError => Some("The API quota is exhausted, retry later"),
            ErrorKind::NetworkError => Some("Check the network connection and retry"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }
}

/// The single outward contract of the orchestrator.
#[derive(Debug, Clone)]
pub enum GenerationResult {
    Success(Box<GenerationSuccess>),
    PlanFallback(Box<FallbackPlan>),
    Error(GenerationError),
}

impl GenerationResult {
    pub fn outcome_label(&self) -> &'static str {
        match self {
            GenerationResult::Success(_) => "success",
            GenerationResult::PlanFallback(_) => "plan_fallback",
            GenerationResult::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_prompt_is_not_rewritten() {
        let prompt = OptimizedPrompt::identity("a cat on a roof");
        assert_eq!(prompt.original, prompt.optimized);
        assert!(!prompt.was_rewritten());
    }

    #[test]
    fn error_kinds_serialize_to_wire_codes() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::QuotaExceededError).unwrap(),
            "\"quota_exceeded\""
        );
        assert_eq!(ErrorKind::CredentialError.as_str(), "api_key_invalid");
        assert!(ErrorKind::QuotaExceededError.hint().is_some());
        assert!(ErrorKind::UnknownError.hint().is_none());
    }
}
