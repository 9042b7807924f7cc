use axum::body::Bytes;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// Formats the deriver can decode and re-encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailFormat {
    Png,
    Jpeg,
}

impl ThumbnailFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "image/png",
            ThumbnailFormat::Jpeg => "image/jpeg",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ThumbnailFormat::Png => ImageFormat::Png,
            ThumbnailFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResizeError {
    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Resized image bytes plus their format
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub body: Bytes,
    pub format: ThumbnailFormat,
}

/// Decode, cover-fit to exactly `width`x`height`, and re-encode in the source format.
///
/// CPU-bound; callers on the async runtime go through `spawn_blocking`.
pub fn resize(source: &[u8], width: u32, height: u32) -> Result<Thumbnail, ResizeError> {
    let reader = ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| ResizeError::Decode(e.to_string()))?;

    let format = match reader.format() {
        Some(ImageFormat::Png) => ThumbnailFormat::Png,
        Some(ImageFormat::Jpeg) => ThumbnailFormat::Jpeg,
        _ => return Err(ResizeError::UnsupportedFormat),
    };

    let decoded = reader.decode().map_err(|e| ResizeError::Decode(e.to_string()))?;
    let resized = decoded.resize_to_fill(width, height, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    let written = match format {
        // JPEG has no alpha channel
        ThumbnailFormat::Jpeg => image::DynamicImage::ImageRgb8(resized.to_rgb8())
            .write_to(&mut out, format.image_format()),
        ThumbnailFormat::Png => resized.write_to(&mut out, format.image_format()),
    };
    written.map_err(|e| ResizeError::Encode(e.to_string()))?;

    Ok(Thumbnail {
        body: Bytes::from(out.into_inner()),
        format,
    })
}
