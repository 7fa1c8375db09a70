use serde::{Deserialize, Serialize};

/// Shortest clip the video model accepts.
pub const MIN_DURATION_SECS: u32 = 5;

/// Longest clip the video model accepts.
pub const MAX_DURATION_SECS: u32 = 8;

/// Appended to every negative prompt sent to the video model.
pub const QUALITY_GUARD: &str = "ugly, low quality, blurry, distorted";

/// Visual style a video is generated in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoStyle {
    #[default]
    #[serde(rename = "realistic")]
    Realistic,
    #[serde(rename = "cinematic")]
    Cinematic,
    #[serde(rename = "artistic")]
    Artistic,
    #[serde(rename = "animation")]
    Animation,
    #[serde(rename = "vintage")]
    Vintage,
    #[serde(rename = "futuristic")]
    Futuristic,
    /// Used for image-conditioned requests, which carry no user style.
    #[serde(rename = "image-to-video")]
    ImageToVideo,
}

impl VideoStyle {
    /// Styles offered to callers, in display order.
    pub const SELECTABLE: [VideoStyle; 6] = [
        VideoStyle::Realistic,
        VideoStyle::Cinematic,
        VideoStyle::Artistic,
        VideoStyle::Animation,
        VideoStyle::Vintage,
        VideoStyle::Futuristic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStyle::Realistic => "realistic",
            VideoStyle::Cinematic => "cinematic",
            VideoStyle::Artistic => "artistic",
            VideoStyle::Animation => "animation",
            VideoStyle::Vintage => "vintage",
            VideoStyle::Futuristic => "futuristic",
            VideoStyle::ImageToVideo => "image-to-video",
        }
    }
}

impl std::fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VideoStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "realistic" => Ok(VideoStyle::Realistic),
            "cinematic" => Ok(VideoStyle::Cinematic),
            "artistic" => Ok(VideoStyle::Artistic),
            "animation" => Ok(VideoStyle::Animation),
            "vintage" => Ok(VideoStyle::Vintage),
            "futuristic" => Ok(VideoStyle::Futuristic),
            "image-to-video" => Ok(VideoStyle::ImageToVideo),
            other => Err(format!("Unknown video style: {}", other)),
        }
    }
}

/// Output frame shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 2] = [AspectRatio::Landscape, AspectRatio::Portrait];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            other => Err(format!("Unsupported aspect ratio: {}", other)),
        }
    }
}

/// Image bytes conditioning a video generation.
#[derive(Clone)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    /// Where the image came from (upload name or project path), for logs.
    pub origin: String,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("origin", &self.origin)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A single video generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source_prompt: String,
    /// Duration as requested by the caller, before clamping.
    pub duration_seconds: u32,
    pub style: VideoStyle,
    pub aspect_ratio: AspectRatio,
    pub negative_prompt: String,
    pub source_image: Option<SourceImage>,
    /// False when the prompt is a built-in default rather than caller text.
    pub optimize_prompt: bool,
}

impl GenerationRequest {
    /// Text-to-video request with default duration, style and aspect ratio.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            source_prompt: prompt.into(),
            duration_seconds: MAX_DURATION_SECS,
            style: VideoStyle::default(),
            aspect_ratio: AspectRatio::default(),
            negative_prompt: String::new(),
            source_image: None,
            optimize_prompt: true,
        }
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_style(mut self, style: VideoStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = negative_prompt.into();
        self
    }

    pub fn with_source_image(mut self, image: SourceImage) -> Self {
        self.source_image = Some(image);
        self
    }

    pub fn without_prompt_optimization(mut self) -> Self {
        self.optimize_prompt = false;
        self
    }

    /// Duration sent to the provider, clamped to what the model supports.
    pub fn effective_duration(&self) -> u32 {
        self.duration_seconds
            .clamp(MIN_DURATION_SECS, MAX_DURATION_SECS)
    }

    /// User negative prompt followed by the fixed quality guard.
    pub fn composed_negative_prompt(&self) -> String {
        let user = self.negative_prompt.trim();
        if user.is_empty() {
            QUALITY_GUARD.to_string()
        } else {
            format!("{}, {}", user, QUALITY_GUARD)
        }
    }

    pub fn is_image_conditioned(&self) -> bool {
        self.source_image.is_some()
    }

    pub fn echo(&self) -> RequestEcho {
        RequestEcho {
            prompt: self.source_prompt.clone(),
            requested_duration_seconds: self.duration_seconds,
            duration_seconds: self.effective_duration(),
            style: self.style,
            aspect_ratio: self.aspect_ratio,
            source_image: self.source_image.as_ref().map(|i| i.origin.clone()),
        }
    }
}

/// The caller-visible summary of a request, echoed on every result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RequestEcho {
    pub prompt: String,
    pub requested_duration_seconds: u32,
    /// Duration actually sent to the provider.
    pub duration_seconds: u32,
    pub style: VideoStyle,
    pub aspect_ratio: AspectRatio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_clamped_to_model_limits() {
        assert_eq!(GenerationRequest::new("x").with_duration(30).effective_duration(), 8);
        assert_eq!(GenerationRequest::new("x").with_duration(2).effective_duration(), 5);
        assert_eq!(GenerationRequest::new("x").with_duration(6).effective_duration(), 6);
    }

    #[test]
    fn echo_reports_requested_and_effective_duration() {
        let echo = GenerationRequest::new("a cat").with_duration(12).echo();
        assert_eq!(echo.requested_duration_seconds, 12);
        assert_eq!(echo.duration_seconds, 8);
    }

    #[test]
    fn negative_prompt_always_carries_quality_guard() {
        let plain = GenerationRequest::new("x");
        assert_eq!(plain.composed_negative_prompt(), QUALITY_GUARD);

        let custom = GenerationRequest::new("x").with_negative_prompt("  text overlays ");
        assert_eq!(
            custom.composed_negative_prompt(),
            "text overlays, ugly, low quality, blurry, distorted"
        );
    }

    #[test]
    fn style_and_ratio_parse_from_wire_names() {
        assert_eq!("Cinematic".parse::<VideoStyle>(), Ok(VideoStyle::Cinematic));
        assert_eq!("9:16".parse::<AspectRatio>(), Ok(AspectRatio::Portrait));
        assert!("4:3".parse::<AspectRatio>().is_err());
        assert_eq!(
            serde_json::to_string(&AspectRatio::Landscape).unwrap(),
            "\"16:9\""
        );
    }
}
