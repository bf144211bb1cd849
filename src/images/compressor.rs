//! Image compressor
//!
//! Decodes any format the `image` crate understands, flattens it to 8-bit RGB
//! (alpha is dropped) and re-encodes it as JPEG.

use crate::config::DEFAULT_JPEG_QUALITY;
use crate::error::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

/// JPEG quality on the 0–100 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    /// Validate a quality value
    ///
    /// # Errors
    /// Returns `AppError::InvalidInput` for values above 100
    pub fn new(value: u8) -> Result<Self, AppError> {
        if value > 100 {
            return Err(AppError::InvalidInput(format!(
                "Quality must be between 0 and 100, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Parse a quality value from a form field
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let value = raw.trim().parse::<u8>().map_err(|_| {
            AppError::InvalidInput(format!("Quality must be an integer 0-100, got {:?}", raw))
        })?;
        Self::new(value)
    }

    /// The requested value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Value handed to the encoder; the encoder's scale starts at 1
    fn encoder_value(self) -> u8 {
        self.0.max(1)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_JPEG_QUALITY)
    }
}

/// A recompressed image, named after its source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    /// Original filename
    pub filename: String,
    /// JPEG bytes
    pub bytes: Vec<u8>,
}

/// Recompress one image
///
/// # Returns
/// * `Ok(CompressedImage)` - JPEG bytes under the original filename
/// * `Err(AppError::DecodeFailed)` - If the bytes are not a decodable image
pub fn compress(filename: &str, bytes: &[u8], quality: Quality) -> Result<CompressedImage, AppError> {
    let decode_failed = |reason: String| AppError::DecodeFailed {
        filename: filename.to_string(),
        reason,
    };

    let decoded = image::load_from_memory(bytes).map_err(|e| decode_failed(e.to_string()))?;
    let rgb = decoded.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.encoder_value())
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| decode_failed(e.to_string()))?;

    Ok(CompressedImage {
        filename: filename.to_string(),
        bytes: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).expect("Failed to encode fixture");
        buf.into_inner()
    }

    fn noisy_rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 37 % 256) as u8,
                (y * 91 % 256) as u8,
                ((x ^ y) * 13 % 256) as u8,
            ])
        }))
    }

    #[test]
    fn test_quality_bounds() {
        assert_eq!(Quality::default().value(), 70);
        assert!(Quality::new(0).is_ok());
        assert!(Quality::new(100).is_ok());
        assert!(matches!(Quality::new(101), Err(AppError::InvalidInput(_))));
        assert_eq!(Quality::parse(" 85 ").unwrap().value(), 85);
        assert!(Quality::parse("high").is_err());
        assert!(Quality::parse("-1").is_err());
    }

    #[test]
    fn test_png_with_alpha_becomes_rgb_jpeg() {
        let png = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([200, 10, 10, 40]))),
            ImageOutputFormat::Png,
        );

        let compressed = compress("logo.png", &png, Quality::default()).expect("Should compress");
        assert_eq!(compressed.filename, "logo.png");
        assert_eq!(
            image::guess_format(&compressed.bytes).unwrap(),
            ImageFormat::Jpeg
        );

        let decoded = image::load_from_memory(&compressed.bytes).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let png = encode(noisy_rgb(64, 64), ImageOutputFormat::Png);

        let high = compress("a.png", &png, Quality::new(95).unwrap()).unwrap();
        let low = compress("a.png", &png, Quality::new(10).unwrap()).unwrap();
        assert!(low.bytes.len() < high.bytes.len());
    }

    #[test]
    fn test_zero_quality_is_accepted() {
        let png = encode(noisy_rgb(16, 16), ImageOutputFormat::Png);
        let compressed = compress("a.png", &png, Quality::new(0).unwrap()).unwrap();
        assert!(!compressed.bytes.is_empty());
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        match compress("notes.txt", b"definitely not an image", Quality::default()) {
            Err(AppError::DecodeFailed { filename, .. }) => assert_eq!(filename, "notes.txt"),
            other => panic!("Expected DecodeFailed, got: {:?}", other),
        }
    }
}
