//! Retouch Core - pixel and geometry routines of the edit engine
//!
//! This crate holds everything that is a pure function of its inputs:
//! decoding uploads, the crop validator, the transform compositor that
//! replays every local edit from the original, encoding renders for the
//! processing service, and the descriptors of remote named operations.

pub mod color;
pub mod compose;
pub mod decode;
pub mod encode;
pub mod geometry;
pub mod histogram;
pub mod operation;
pub mod transform;

pub use compose::{compose, ComposeError};
pub use decode::{decode_image, DecodeError, RgbRaster};
pub use encode::{encode, EncodeError, RasterFormat};
pub use geometry::{check_crop, validate_crop, CropRect, ValidationError};
pub use histogram::{HistogramError, HistogramReport};
pub use operation::NamedOperation;

/// Neutral value of every colour adjustment.
pub const NEUTRAL_PERCENT: f64 = 100.0;

/// Brightness, contrast and saturation as multiplicative percentages.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorAdjustments {
    /// Output multiplier (0 = black, 100 = unchanged)
    pub brightness: f64,
    /// Spread around mid-grey (0 = flat grey, 100 = unchanged)
    pub contrast: f64,
    /// Distance from luma (0 = greyscale, 100 = unchanged)
    pub saturation: f64,
}

impl Default for ColorAdjustments {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL_PERCENT,
            contrast: NEUTRAL_PERCENT,
            saturation: NEUTRAL_PERCENT,
        }
    }
}

impl ColorAdjustments {
    pub fn new(brightness: f64, contrast: f64, saturation: f64) -> Self {
        Self {
            brightness,
            contrast,
            saturation,
        }
    }

    /// Check if all values are at 100
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    /// Reject negative or non-finite percentages.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidColor { name, value });
            }
        }
        Ok(())
    }
}

/// The complete set of local, non-destructive edits.
///
/// Every render receives the whole struct, never a delta.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EditParameters {
    /// Degrees, wrapped into [0, 360)
    pub rotation: f64,
    /// Crop in original pixel coordinates; `None` is the full frame
    pub crop: Option<CropRect>,
    /// Output scale factor (1.0 = 100%)
    pub scale: f64,
    pub color: ColorAdjustments,
}

impl Default for EditParameters {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            crop: None,
            scale: 1.0,
            color: ColorAdjustments::default(),
        }
    }
}

impl EditParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if rendering with these parameters reproduces the original
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Add `delta` degrees, keeping the result in [0, 360).
    pub fn rotate_by(&mut self, delta: f64) -> Result<(), ValidationError> {
        if !delta.is_finite() {
            return Err(ValidationError::InvalidRotation(delta));
        }
        self.rotation = transform::normalize_degrees(self.rotation + delta);
        Ok(())
    }

    /// Reject a non-positive or non-finite scale factor.
    pub fn validate_scale(scale: f64) -> Result<(), ValidationError> {
        if scale.is_finite() && scale > 0.0 {
            Ok(())
        } else {
            Err(ValidationError::InvalidScale(scale))
        }
    }
}
