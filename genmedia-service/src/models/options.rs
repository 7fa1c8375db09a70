//! Static catalogs of the choices a caller can make for a video.

use super::request::{AspectRatio, VideoStyle, MAX_DURATION_SECS, MIN_DURATION_SECS};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StyleOption {
    pub name: &'static str,
    pub description: &'static str,
    pub keywords: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AspectRatioOption {
    pub name: &'static str,
    pub description: &'static str,
    pub use_case: &'static str,
}

/// Everything the options endpoint returns.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VideoOptions {
    pub styles: BTreeMap<&'static str, StyleOption>,
    pub durations: BTreeMap<u32, &'static str>,
    pub aspect_ratios: BTreeMap<&'static str, AspectRatioOption>,
    pub default_style: VideoStyle,
    pub default_duration: u32,
    pub default_aspect_ratio: AspectRatio,
}

impl VideoOptions {
    pub fn catalog() -> Self {
        Self {
            styles: list_styles(),
            durations: list_durations(),
            aspect_ratios: list_aspect_ratios(),
            default_style: VideoStyle::default(),
            default_duration: MAX_DURATION_SECS,
            default_aspect_ratio: AspectRatio::default(),
        }
    }
}

pub fn style_option(style: VideoStyle) -> Option<StyleOption> {
    let option = match style {
        VideoStyle::Realistic => StyleOption {
            name: "Realistic",
            description: "Lifelike footage suited to documentary and real-world scenes",
            keywords: "photorealistic, natural lighting, documentary style",
        },
        VideoStyle::Cinematic => StyleOption {
            name: "Cinematic",
            description: "Film-grade visuals with professional camera work",
            keywords: "cinematic, film noir, dramatic lighting, professional cinematography",
        },
        VideoStyle::Artistic => StyleOption {
            name: "Artistic",
            description: "Stylized, creative look with a distinctive aesthetic",
            keywords: "artistic, creative, stylized, unique aesthetic",
        },
        VideoStyle::Animation => StyleOption {
            name: "Animation",
            description: "Animated look for cartoon and playful content",
            keywords: "3D animation, cartoon style, animated, colorful",
        },
        VideoStyle::Vintage => StyleOption {
            name: "Vintage",
            description: "Nostalgic, retro visual style",
            keywords: "vintage, retro, classic, nostalgic, film grain",
        },
        VideoStyle::Futuristic => StyleOption {
            name: "Futuristic",
            description: "Sci-fi visuals with a high-tech feel",
            keywords: "futuristic, sci-fi, cyberpunk, neon, high-tech",
        },
        VideoStyle::ImageToVideo => return None,
    };
    Some(option)
}

pub fn list_styles() -> BTreeMap<&'static str, StyleOption> {
    VideoStyle::SELECTABLE
        .iter()
        .filter_map(|style| style_option(*style).map(|option| (style.as_str(), option)))
        .collect()
}

pub fn list_durations() -> BTreeMap<u32, &'static str> {
    (MIN_DURATION_SECS..=MAX_DURATION_SECS)
        .map(|seconds| {
            let description = match seconds {
                5 => "5 seconds - quick showcase",
                6 => "6 seconds - standard short clip",
                7 => "7 seconds - detailed showcase",
                _ => "8 seconds - complete narrative",
            };
            (seconds, description)
        })
        .collect()
}

pub fn list_aspect_ratios() -> BTreeMap<&'static str, AspectRatioOption> {
    AspectRatio::ALL
        .iter()
        .map(|ratio| {
            let option = match ratio {
                AspectRatio::Landscape => AspectRatioOption {
                    name: "Landscape (16:9)",
                    description: "For desktop and TV viewing, landscapes and wide scenes",
                    use_case: "Film, scenery, product showcases",
                },
                AspectRatio::Portrait => AspectRatioOption {
                    name: "Portrait (9:16)",
                    description: "For phone viewing and social short-form video",
                    use_case: "TikTok, Instagram Stories, mobile video",
                },
            };
            (ratio.as_str(), option)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listings_are_stable_across_calls() {
        assert_eq!(list_styles(), list_styles());
        assert_eq!(list_durations(), list_durations());
        assert_eq!(list_aspect_ratios(), list_aspect_ratios());
        assert_eq!(VideoOptions::catalog(), VideoOptions::catalog());
    }

    #[test]
    fn catalog_covers_selectable_choices() {
        let styles = list_styles();
        assert_eq!(styles.len(), 6);
        assert!(styles.contains_key("futuristic"));
        assert!(!styles.contains_key("image-to-video"));

        let durations: Vec<u32> = list_durations().keys().copied().collect();
        assert_eq!(durations, vec![5, 6, 7, 8]);

        let ratios = list_aspect_ratios();
        assert_eq!(ratios.len(), 2);
        assert!(ratios["9:16"].use_case.contains("TikTok"));
    }
}
