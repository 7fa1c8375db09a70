//! Source image preparation for provider calls.

use super::providers::InlineImage;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use thiserror::Error;

/// File extensions accepted as source images.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

const JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Image is empty")]
    Empty,

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Image could not be decoded: {0}")]
    Decode(String),

    #[error("Image could not be re-encoded: {0}")]
    Encode(String),
}

pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// MIME type sniffed from the image bytes.
pub fn detect_mime(bytes: &[u8]) -> Result<&'static str, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    let mime = match image::guess_format(bytes).map_err(|_| MediaError::UnsupportedFormat)? {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::WebP => "image/webp",
        _ => return Err(MediaError::UnsupportedFormat),
    };
    Ok(mime)
}

/// MIME type of an image that also decodes in full.
pub fn check_decodable(bytes: &[u8]) -> Result<&'static str, MediaError> {
    let mime = detect_mime(bytes)?;
    image::load_from_memory(bytes).map_err(|e| MediaError::Decode(e.to_string()))?;
    Ok(mime)
}

/// Inline image for question answering, sent as uploaded.
pub fn inline_as_is(bytes: Vec<u8>) -> Result<InlineImage, MediaError> {
    let mime_type = detect_mime(&bytes)?.to_string();
    Ok(InlineImage { bytes, mime_type })
}

/// Decode any supported image and re-encode it as an opaque RGB JPEG, the
/// form the video model accepts. Transparent pixels are flattened onto white.
pub fn prepare_for_video(bytes: &[u8]) -> Result<InlineImage, MediaError> {
    detect_mime(bytes)?;
    let decoded = image::load_from_memory(bytes).map_err(|e| MediaError::Decode(e.to_string()))?;
    let rgb = flatten_onto_white(&decoded);

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        input_bytes = bytes.len(),
        output_bytes = jpeg.len(),
        "Source image prepared"
    );

    Ok(InlineImage {
        bytes: jpeg,
        mime_type: "image/jpeg".to_string(),
    })
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8 };
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}
