//! Decoding of uploaded image files into RGB rasters.
//!
//! Uploads arrive as encoded bytes (JPEG, PNG). They are decoded once, with
//! EXIF orientation applied, and the resulting [`RgbRaster`] becomes the
//! immutable original that every render replays from.

mod image_file;
mod types;

pub use image_file::{decode_image, decode_image_no_orientation};
pub use types::{DecodeError, Orientation, RgbRaster};
