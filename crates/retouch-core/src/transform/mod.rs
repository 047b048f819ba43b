//! Geometric building blocks of the compositor.
//!
//! # Coordinate System
//!
//! - Rotation angles are in degrees, positive = clockwise on screen, and are
//!   stored wrapped into `[0, 360)`
//! - Crop rectangles are in original-image pixel coordinates, before rotation
//! - Origin is the top-left corner; pixel centres sit at `+0.5`

mod rotation;
mod sample;

pub use rotation::{compute_rotated_bounds, normalize_degrees, rotation_trig};
pub use sample::{sample_bilinear, SourceRegion};
