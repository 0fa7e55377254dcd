//! Image preparation: decode, validate, resize, re-encode.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Formats accepted from the wild. Anything else is rejected before decode.
const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Re-encoding target for uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Jpeg,
    Png,
    WebP,
}

impl ImageEncoding {
    /// The matching `image` crate format.
    pub fn format(&self) -> ImageFormat {
        match self {
            ImageEncoding::Jpeg => ImageFormat::Jpeg,
            ImageEncoding::Png => ImageFormat::Png,
            ImageEncoding::WebP => ImageFormat::WebP,
        }
    }

    /// MIME type for CMS upload.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
            ImageEncoding::WebP => "image/webp",
        }
    }

    /// File extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Png => "png",
            ImageEncoding::WebP => "webp",
        }
    }
}

/// Decode raw bytes (format sniffed from magic bytes), validate the
/// format, resize to fit `max_width` preserving aspect ratio, and
/// re-encode to the target encoding.
pub fn prepare_image(data: &[u8], max_width: u32, encoding: ImageEncoding) -> Result<Vec<u8>> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| EngineError::ImageProcessing(format!("failed to read image: {}", e)))?;

    let format = reader
        .format()
        .ok_or_else(|| EngineError::ImageProcessing("could not detect image format".to_string()))?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(EngineError::ImageProcessing(format!(
            "unsupported image format: {:?}",
            format
        )));
    }

    let img = reader
        .decode()
        .map_err(|e| EngineError::ImageProcessing(format!("failed to decode image: {}", e)))?;

    let resized = if img.width() > max_width {
        let height = (u64::from(img.height()) * u64::from(max_width) / u64::from(img.width()))
            .max(1) as u32;
        img.thumbnail(max_width, height)
    } else {
        img
    };

    let mut buf = Cursor::new(Vec::new());
    resized
        .write_to(&mut buf, encoding.format())
        .map_err(|e| EngineError::ImageProcessing(format!("failed to encode image: {}", e)))?;

    Ok(buf.into_inner())
}

/// Upload filename for a section image.
pub fn image_filename(slug: &str, index: u32, encoding: ImageEncoding) -> String {
    format!("{}-{}.{}", slug, index, encoding.extension())
}
