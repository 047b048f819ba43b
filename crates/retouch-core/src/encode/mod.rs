//! Encoding of rendered rasters for transfer to the processing service.
//!
//! Every committed render is encoded here before upload. PNG is lossless and
//! is the default so the backend sees exactly the pixels shown locally; JPEG
//! trades fidelity for payload size.

mod jpeg;
mod png;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::RgbRaster;

pub use jpeg::encode_jpeg;
pub use png::encode_png;

/// Errors that can occur while encoding a raster.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Wire format for committed rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg {
        /// 1-100, clamped.
        quality: u8,
    },
}

impl RasterFormat {
    /// MIME type sent with multipart uploads.
    pub fn mime_type(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg { .. } => "jpg",
        }
    }
}

/// Encode a raster in the given format.
pub fn encode(raster: &RgbRaster, format: RasterFormat) -> Result<Vec<u8>, EncodeError> {
    match format {
        RasterFormat::Png => encode_png(raster),
        RasterFormat::Jpeg { quality } => encode_jpeg(raster, quality),
    }
}

/// Shared validation for all encoders.
pub(crate) fn validate(raster: &RgbRaster) -> Result<(), EncodeError> {
    if raster.width == 0 || raster.height == 0 {
        return Err(EncodeError::InvalidDimensions {
            width: raster.width,
            height: raster.height,
        });
    }

    let expected = raster.pixel_count() * 3;
    if raster.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: raster.pixels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metadata() {
        assert_eq!(RasterFormat::Png.mime_type(), "image/png");
        assert_eq!(RasterFormat::Jpeg { quality: 90 }.mime_type(), "image/jpeg");
        assert_eq!(RasterFormat::Jpeg { quality: 90 }.extension(), "jpg");
    }

    #[test]
    fn test_format_deserialize() {
        let png: RasterFormat = serde_json::from_str("\"png\"").unwrap();
        assert_eq!(png, RasterFormat::Png);
        let jpeg: RasterFormat = serde_json::from_str(r#"{"jpeg":{"quality":85}}"#).unwrap();
        assert_eq!(jpeg, RasterFormat::Jpeg { quality: 85 });
    }

    #[test]
    fn test_encode_dispatches_by_format() {
        let img = RgbRaster::filled(8, 8, [40, 80, 120]);
        let png = encode(&img, RasterFormat::Png).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let jpeg = encode(&img, RasterFormat::Jpeg { quality: 80 }).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let img = RgbRaster::new(0, 10, vec![]);
        assert!(matches!(
            validate(&img),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }
}
