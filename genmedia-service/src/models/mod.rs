//! Domain models for the genmedia service.

pub mod options;
pub mod request;
pub mod result;

pub use options::{AspectRatioOption, StyleOption, VideoOptions};
pub use request::{
    AspectRatio, GenerationRequest, RequestEcho, SourceImage, VideoStyle, MAX_DURATION_SECS,
    MIN_DURATION_SECS,
};
pub use result::{
    ArtifactKind, ErrorKind, FallbackPlan, FallbackReason, GeneratedArtifact, GenerationError,
    GenerationResult, GenerationSuccess, GenerationTiming, OptimizedPrompt, VideoOutput,
};
