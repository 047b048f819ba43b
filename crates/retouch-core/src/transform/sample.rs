//! Source-region resolution and bilinear sampling.

use crate::decode::RgbRaster;
use crate::geometry::CropRect;

/// The part of the original that a render paints from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceRegion {
    /// The crop rectangle clipped to the image, or the full frame.
    ///
    /// `None` when the crop lies entirely outside the image.
    pub fn resolve(crop: Option<&CropRect>, width: u32, height: u32) -> Option<Self> {
        let Some(crop) = crop else {
            return Some(Self {
                x: 0.0,
                y: 0.0,
                width: width as f64,
                height: height as f64,
            });
        };
        let (x, y, width, height) = crop.clamp_to(width, height)?;
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }
}

/// Sample `image` at continuous coordinates with bilinear weights.
///
/// Integer coordinates address pixel centres; coordinates are clamped to the
/// `[min, max]` pixel box so sampling at the border of a crop repeats the
/// border pixel instead of bleeding in black.
pub fn sample_bilinear(
    image: &RgbRaster,
    x: f64,
    y: f64,
    min: (u32, u32),
    max: (u32, u32),
) -> [u8; 3] {
    let x = x.clamp(min.0 as f64, max.0 as f64);
    let y = y.clamp(min.1 as f64, max.1 as f64);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(max.0);
    let y1 = (y0 + 1).min(max.1);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image.pixel(x0, y0);
    let p10 = image.pixel(x1, y0);
    let p01 = image.pixel(x0, y1);
    let p11 = image.pixel(x1, y1);

    let mut result = [0u8; 3];
    for i in 0..3 {
        let v = p00[i] as f64 * (1.0 - fx) * (1.0 - fy)
            + p10[i] as f64 * fx * (1.0 - fy)
            + p01[i] as f64 * (1.0 - fx) * fy
            + p11[i] as f64 * fx * fy;
        result[i] = v.clamp(0.0, 255.0).round() as u8;
    }
    result
}
