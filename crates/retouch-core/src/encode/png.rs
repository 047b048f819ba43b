//! Lossless PNG encoding.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{validate, EncodeError};
use crate::decode::RgbRaster;

/// Encode a raster as an 8-bit RGB PNG.
pub fn encode_png(raster: &RgbRaster) -> Result<Vec<u8>, EncodeError> {
    validate(raster)?;

    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
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
    use crate::decode::decode_image;

    #[test]
    fn test_png_signature() {
        let bytes = encode_png(&RgbRaster::filled(3, 2, [1, 2, 3])).unwrap();
        assert_eq!(&bytes[0..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_png_is_lossless() {
        let pixels: Vec<u8> = (0..(16 * 9 * 3)).map(|i| (i * 7 % 256) as u8).collect();
        let img = RgbRaster::new(16, 9, pixels);
        let decoded = decode_image(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_png_rejects_short_buffer() {
        let img = RgbRaster {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        assert!(matches!(
            encode_png(&img),
            Err(EncodeError::InvalidPixelData {
                expected: 48,
                actual: 10
            })
        ));
    }
}
