use crate::models::{
    AspectRatio, GenerationError, GenerationRequest, VideoOptions, VideoStyle, MAX_DURATION_SECS,
};
use crate::services::LocalImage;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Prompt used when an image is animated without instructions.
pub const DEFAULT_ANIMATION_PROMPT: &str =
    "Animate this image with natural motion and cinematic quality";

fn default_duration() -> u32 {
    MAX_DURATION_SECS
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 4000, message = "Prompt must be 1 to 4000 characters"))]
    pub prompt: String,
    /// Requested seconds; the model range is applied later.
    #[serde(default = "default_duration")]
    #[validate(range(min = 1, max = 60))]
    pub duration: u32,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub negative_prompt: String,
}

impl GenerateVideoRequest {
    pub fn into_generation_request(self) -> Result<GenerationRequest, GenerationError> {
        Ok(GenerationRequest::new(self.prompt)
            .with_duration(self.duration)
            .with_style(parse_style(self.style.as_deref())?)
            .with_aspect_ratio(parse_aspect_ratio(self.aspect_ratio.as_deref())?)
            .with_negative_prompt(self.negative_prompt))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LocalImageVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "image_path is required"))]
    pub image_path: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_duration")]
    #[validate(range(min = 1, max = 60))]
    pub duration: u32,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

/// Image-conditioned request; a blank prompt gets the default animation prompt.
pub fn image_generation_request(
    prompt: &str,
    duration: u32,
    aspect_ratio: Option<&str>,
) -> Result<GenerationRequest, GenerationError> {
    let request = match prompt.trim() {
        "" => GenerationRequest::new(DEFAULT_ANIMATION_PROMPT).without_prompt_optimization(),
        p => GenerationRequest::new(p),
    };
    Ok(request
        .with_duration(duration)
        .with_style(VideoStyle::ImageToVideo)
        .with_aspect_ratio(parse_aspect_ratio(aspect_ratio)?))
}

pub fn parse_style(raw: Option<&str>) -> Result<VideoStyle, GenerationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(VideoStyle::default()),
        Some(s) => s.parse().map_err(GenerationError::validation),
    }
}

pub fn parse_aspect_ratio(raw: Option<&str>) -> Result<AspectRatio, GenerationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(AspectRatio::default()),
        Some(s) => s.parse().map_err(GenerationError::validation),
    }
}

#[derive(Debug, Serialize)]
pub struct VideoOptionsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub options: VideoOptions,
}

#[derive(Debug, Serialize)]
pub struct LocalImagesResponse {
    pub success: bool,
    pub total: usize,
    pub message: String,
    pub images: Vec<LocalImage>,
}

impl From<Vec<LocalImage>> for LocalImagesResponse {
    fn from(images: Vec<LocalImage>) -> Self {
        Self {
            success: true,
            total: images.len(),
            message: format!("Found {} local image(s)", images.len()),
            images,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub message: String,
    pub model: String,
    pub supported_features: Vec<&'static str>,
}

pub const SUPPORTED_FEATURES: [&str; 5] = [
    "text-to-video",
    "image-to-video",
    "local-image-to-video",
    "prompt-enhancement",
    "multiple-aspect-ratios",
];
