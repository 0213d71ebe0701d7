//! Background layer: decoding, fitting and replacement policy.

use crate::shapes::ImageFormat;
use crate::upload::UploadError;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Errors from installing a background.
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("Empty media data")]
    Empty,
    #[error("Unsupported image format")]
    UnsupportedFormat,
    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// A decoded still ready to become the background.
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapSource {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl BitmapSource {
    /// Decode encoded image bytes in full; the pixels are dropped, the dimensions kept.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, BackgroundError> {
        if bytes.is_empty() {
            return Err(BackgroundError::Empty);
        }
        let format = ImageFormat::from_magic_bytes(&bytes).ok_or(BackgroundError::UnsupportedFormat)?;
        let decoded = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| BackgroundError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| BackgroundError::Decode(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(BackgroundError::Decode("zero-sized image".to_string()));
        }
        Ok(Self {
            format,
            bytes,
            width,
            height,
        })
    }

    /// Build from a frame the shell already rasterized (e.g. the first frame of a video).
    pub fn from_frame(format: ImageFormat, bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            format,
            bytes,
            width,
            height,
        }
    }
}

/// Largest surface a background may resize the canvas to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBounds {
    pub max_width: f64,
    pub max_height: f64,
}

impl FitBounds {
    /// Bounds from viewport fractions, capped at an absolute size.
    pub fn from_viewport(
        viewport_width: f64,
        viewport_height: f64,
        width_fraction: f64,
        height_fraction: f64,
        cap: (f64, f64),
    ) -> Self {
        Self {
            max_width: (viewport_width * width_fraction).min(cap.0),
            max_height: (viewport_height * height_fraction).min(cap.1),
        }
    }

    /// Scale `(width, height)` down to fit, keeping aspect ratio. Never scales up.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        let (w, h) = (width as f64, height as f64);
        if w <= self.max_width && h <= self.max_height {
            return (width, height);
        }
        let scale = (self.max_width / w).min(self.max_height / h);
        (
            ((w * scale).round() as u32).max(1),
            ((h * scale).round() as u32).max(1),
        )
    }
}

/// The single backdrop drawn beneath all scene objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundLayer {
    pub format: ImageFormat,
    pub data_base64: String,
    pub source_width: u32,
    pub source_height: u32,
    /// Size the background is drawn at; the render surface matches it.
    pub display_width: u32,
    pub display_height: u32,
}

impl BackgroundLayer {
    pub fn from_source(source: &BitmapSource, bounds: &FitBounds) -> Self {
        let (display_width, display_height) = bounds.fit(source.width, source.height);
        Self {
            format: source.format,
            data_base64: STANDARD.encode(&source.bytes),
            source_width: source.width,
            source_height: source.height,
            display_width,
            display_height,
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), self.data_base64)
    }
}

/// What happens to existing objects when the background is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackgroundPolicy {
    /// Objects stay on top of the new background.
    #[default]
    Overlay,
    /// The scene is emptied before the new background is installed.
    ClearObjects,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_dimensions() {
        let source = BitmapSource::decode(png_bytes(12, 7)).unwrap();
        assert_eq!((source.width, source.height), (12, 7));
        assert_eq!(source.format, ImageFormat::Png);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(BitmapSource::decode(Vec::new()), Err(BackgroundError::Empty)));
        assert!(matches!(
            BitmapSource::decode(vec![1, 2, 3, 4, 5]),
            Err(BackgroundError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_image() {
        let mut bytes = png_bytes(64, 64);
        // Signature and header survive, pixel data does not.
        bytes.truncate(40);
        assert!(matches!(BitmapSource::decode(bytes), Err(BackgroundError::Decode(_))));
    }

    #[test]
    fn test_fit_scales_down_only() {
        let bounds = FitBounds::from_viewport(1000.0, 1000.0, 0.9, 0.7, (700.0, 500.0));
        assert_eq!(bounds.max_width, 700.0);
        assert_eq!(bounds.max_height, 500.0);
        assert_eq!(bounds.fit(1400, 700), (700, 350));
        assert_eq!(bounds.fit(400, 1000), (200, 500));
        assert_eq!(bounds.fit(300, 200), (300, 200));
    }

    #[test]
    fn test_fit_small_viewport() {
        let bounds = FitBounds::from_viewport(400.0, 300.0, 0.9, 0.7, (700.0, 500.0));
        assert_eq!(bounds.fit(720, 420), (360, 210));
    }
}
