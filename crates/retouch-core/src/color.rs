//! Brightness, contrast and saturation.
//!
//! ## Adjustment Order
//! 1. Contrast, pivoting on mid-grey 128
//! 2. Brightness, as a multiplier
//! 3. Saturation, blending each channel against luma
//!
//! All three values are percentages where 100 is neutral. Results are
//! rounded and clamped to `[0, 255]`.

use crate::ColorAdjustments;

/// ITU-R BT.601 luma coefficient for red.
pub const LUMA_R: f64 = 0.2989;

/// ITU-R BT.601 luma coefficient for green.
pub const LUMA_G: f64 = 0.5870;

/// ITU-R BT.601 luma coefficient for blue.
pub const LUMA_B: f64 = 0.1140;

/// Luma of an RGB triple in channel units.
#[inline]
pub fn luma(r: f64, g: f64, b: f64) -> f64 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

/// Apply the colour adjustments to RGB pixel data in place.
///
/// Neutral adjustments leave the buffer untouched.
pub fn apply_color(pixels: &mut [u8], adjustments: &ColorAdjustments) {
    if adjustments.is_neutral() {
        return;
    }

    let contrast = adjustments.contrast / 100.0;
    let brightness = adjustments.brightness / 100.0;
    let saturation = adjustments.saturation / 100.0;

    for chunk in pixels.chunks_exact_mut(3) {
        let [r, g, b] = adjust_pixel(
            [chunk[0], chunk[1], chunk[2]],
            contrast,
            brightness,
            saturation,
        );
        chunk[0] = r;
        chunk[1] = g;
        chunk[2] = b;
    }
}

/// Adjust one pixel; factors are fractions (1.0 = neutral).
#[inline]
fn adjust_pixel(rgb: [u8; 3], contrast: f64, brightness: f64, saturation: f64) -> [u8; 3] {
    let tone = |v: u8| ((v as f64 - 128.0) * contrast + 128.0) * brightness;
    let (r, g, b) = (tone(rgb[0]), tone(rgb[1]), tone(rgb[2]));

    let l = luma(r, g, b);
    let saturate = |v: f64| to_channel(l + (v - l) * saturation);

    [saturate(r), saturate(g), saturate(b)]
}

#[inline]
fn to_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjust(rgb: [u8; 3], brightness: f64, contrast: f64, saturation: f64) -> [u8; 3] {
        let mut pixels = rgb.to_vec();
        apply_color(
            &mut pixels,
            &ColorAdjustments::new(brightness, contrast, saturation),
        );
        [pixels[0], pixels[1], pixels[2]]
    }

    #[test]
    fn test_luma_coefficients() {
        let sum = LUMA_R + LUMA_G + LUMA_B;
        assert!((sum - 0.9999).abs() < 1e-9);
        assert!((luma(255.0, 0.0, 0.0) - 76.2195).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_is_noop() {
        let original: Vec<u8> = (0..=255u8).collect::<Vec<_>>().repeat(3);
        let mut pixels = original.clone();
        apply_color(&mut pixels, &ColorAdjustments::default());
        assert_eq!(pixels, original);
    }

    #[test]
    fn test_brightness_scales_grey() {
        assert_eq!(adjust([100, 100, 100], 150.0, 100.0, 100.0), [150, 150, 150]);
        assert_eq!(adjust([100, 100, 100], 50.0, 100.0, 100.0), [50, 50, 50]);
    }

    #[test]
    fn test_brightness_clamps_high() {
        assert_eq!(adjust([200, 250, 10], 200.0, 100.0, 100.0)[1], 255);
    }

    #[test]
    fn test_zero_brightness_is_black() {
        assert_eq!(adjust([90, 180, 255], 0.0, 100.0, 100.0), [0, 0, 0]);
    }

    #[test]
    fn test_contrast_pivots_on_128() {
        assert_eq!(adjust([128, 128, 128], 100.0, 200.0, 100.0), [128, 128, 128]);
        // (160 - 128) * 2 + 128 = 192
        assert_eq!(adjust([160, 160, 160], 100.0, 200.0, 100.0), [192, 192, 192]);
        // (20 - 128) * 2 + 128 = -88 -> clamped to 0
        assert_eq!(adjust([20, 20, 20], 100.0, 200.0, 100.0), [0, 0, 0]);
    }

    #[test]
    fn test_zero_contrast_flattens_to_mid_grey() {
        assert_eq!(adjust([0, 90, 255], 100.0, 0.0, 100.0), [128, 128, 128]);
    }

    #[test]
    fn test_zero_saturation_is_greyscale() {
        let [r, g, b] = adjust([255, 0, 0], 100.0, 100.0, 0.0);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 76);
    }

    #[test]
    fn test_saturation_leaves_grey_alone() {
        assert_eq!(adjust([77, 77, 77], 100.0, 100.0, 180.0), [77, 77, 77]);
    }

    #[test]
    fn test_saturation_boost_clamps() {
        let [r, _, b] = adjust([250, 10, 10], 100.0, 100.0, 200.0);
        assert_eq!(r, 255);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_contrast_applies_before_brightness() {
        // contrast first: (100-128)*1.5+128 = 86, then *2 = 172
        // brightness first would give (200-128)*1.5+128 = 236
        assert_eq!(adjust([100, 100, 100], 200.0, 150.0, 100.0), [172, 172, 172]);
    }
}
