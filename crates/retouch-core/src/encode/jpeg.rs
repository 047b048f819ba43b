//! JPEG encoding for compact commits.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{validate, EncodeError};
use crate::decode::RgbRaster;

/// Encode a raster as JPEG.
///
/// `quality` is clamped to 1-100. 90 and above is suitable when the backend
/// will run further filters on the result; lower values show block artifacts
/// in edge-detection output.
pub fn encode_jpeg(raster: &RgbRaster, quality: u8) -> Result<Vec<u8>, EncodeError> {
    validate(raster)?;

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(
            &raster.pixels,
            raster.width,
            raster.height,
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_markers() {
        let bytes = encode_jpeg(&RgbRaster::filled(100, 100, [128, 128, 128]), 90).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_quality_clamping() {
        let img = RgbRaster::filled(10, 10, [128, 128, 128]);
        assert!(encode_jpeg(&img, 0).is_ok());
        assert!(encode_jpeg(&img, 255).is_ok());
    }

    #[test]
    fn test_encode_jpeg_invalid_pixel_data() {
        let img = RgbRaster {
            width: 100,
            height: 100,
            pixels: vec![128u8; 99 * 100 * 3],
        };
        assert!(matches!(
            encode_jpeg(&img, 90),
            Err(EncodeError::InvalidPixelData { .. })
        ));
    }

    #[test]
    fn test_encode_jpeg_non_square() {
        assert!(encode_jpeg(&RgbRaster::filled(200, 50, [9, 9, 9]), 90).is_ok());
        assert!(encode_jpeg(&RgbRaster::filled(50, 200, [9, 9, 9]), 90).is_ok());
    }
}
