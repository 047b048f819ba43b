//! Crop rectangles and the minimum-size crop rule.
//!
//! Crop rectangles are expressed in pixel coordinates of the *original*,
//! unrotated image. A crop must keep at least half of the shorter natural
//! side in both directions; anything smaller produces renders that are
//! unusable once rotation and scale are layered on top.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fraction of the shorter natural side a crop must keep in each direction.
pub const MIN_CROP_FRACTION: f64 = 0.5;

/// A crop rectangle in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole image.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    /// Intersect with the image bounds, returning `(x, y, width, height)`.
    ///
    /// `None` when nothing of the rectangle lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(f64, f64, f64, f64)> {
        let left = self.x.max(0.0);
        let top = self.y.max(0.0);
        let right = (self.x + self.width).min(width as f64);
        let bottom = (self.y + self.height).min(height as f64);

        if right - left <= 0.0 || bottom - top <= 0.0 {
            return None;
        }
        Some((left, top, right - left, bottom - top))
    }
}

/// Which side of a crop failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropSide {
    Width,
    Height,
}

impl std::fmt::Display for CropSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CropSide::Width => f.write_str("width"),
            CropSide::Height => f.write_str("height"),
        }
    }
}

/// Rejection of an edit parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Crop {side} {actual} is below the minimum of {minimum}")]
    CropTooSmall {
        side: CropSide,
        actual: f64,
        minimum: f64,
    },

    #[error("Crop {side} must be a positive finite number, got {actual}")]
    CropNotFinite { side: CropSide, actual: f64 },

    #[error("Crop at ({x}, {y}) does not overlap the {width}x{height} image")]
    CropOutsideImage {
        x: f64,
        y: f64,
        width: u32,
        height: u32,
    },

    #[error("Scale must be a positive finite factor, got {0}")]
    InvalidScale(f64),

    #[error("Rotation must be a finite angle, got {0}")]
    InvalidRotation(f64),

    #[error("{name} must be a non-negative finite percentage, got {value}")]
    InvalidColor { name: &'static str, value: f64 },

    #[error("Invalid {name} for {operation}: {reason}")]
    InvalidOperationParameter {
        operation: &'static str,
        name: &'static str,
        reason: String,
    },
}

/// Reject a crop that lies entirely outside the image.
pub fn check_overlap(
    candidate: &CropRect,
    width: u32,
    height: u32,
) -> Result<(), ValidationError> {
    match candidate.clamp_to(width, height) {
        Some(_) => Ok(()),
        None => Err(ValidationError::CropOutsideImage {
            x: candidate.x,
            y: candidate.y,
            width,
            height,
        }),
    }
}

/// Minimum crop side for an image of the given natural size.
pub fn min_crop_dimension(natural_width: u32, natural_height: u32) -> f64 {
    MIN_CROP_FRACTION * natural_width.min(natural_height) as f64
}

/// Accept or reject a candidate crop against the image's natural size.
///
/// Called for every candidate while the crop is dragged and once more on
/// commit.
pub fn validate_crop(candidate: &CropRect, natural_width: u32, natural_height: u32) -> bool {
    check_crop(candidate, natural_width, natural_height).is_ok()
}

/// Like [`validate_crop`], naming the offending side on rejection.
///
/// A rectangle that shares no pixel with the image is rejected whatever
/// its size.
pub fn check_crop(
    candidate: &CropRect,
    natural_width: u32,
    natural_height: u32,
) -> Result<(), ValidationError> {
    for (side, actual) in [
        (CropSide::Width, candidate.width),
        (CropSide::Height, candidate.height),
    ] {
        if !actual.is_finite() || actual <= 0.0 {
            return Err(ValidationError::CropNotFinite { side, actual });
        }
    }
    check_overlap(candidate, natural_width, natural_height)?;

    let minimum = min_crop_dimension(natural_width, natural_height);
    if candidate.width < minimum {
        return Err(ValidationError::CropTooSmall {
            side: CropSide::Width,
            actual: candidate.width,
            minimum,
        });
    }
    if candidate.height < minimum {
        return Err(ValidationError::CropTooSmall {
            side: CropSide::Height,
            actual: candidate.height,
            minimum,
        });
    }
    Ok(())
}
