//! Rotation angle handling and rotated bounding boxes.
//!
//! For rotation by angle θ the bounding box of a `w × h` rectangle is:
//! ```text
//! w' = w·|cos θ| + h·|sin θ|
//! h' = w·|sin θ| + h·|cos θ|
//! ```

/// Wrap an angle into `[0, 360)`.
///
/// # Example
///
/// ```
/// use retouch_core::transform::normalize_degrees;
///
/// assert_eq!(normalize_degrees(450.0), 90.0);
/// assert_eq!(normalize_degrees(-90.0), 270.0);
/// ```
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// `(cos θ, sin θ)` for an angle in degrees.
///
/// Quarter turns return exact values so that 90° renders map pixel centres
/// onto pixel centres without floating-point drift.
pub fn rotation_trig(degrees: f64) -> (f64, f64) {
    let normalized = normalize_degrees(degrees);
    let quarter = normalized / 90.0;
    if (quarter - quarter.round()).abs() < 1e-9 {
        return match (quarter.round() as i64).rem_euclid(4) {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
    }
    let rad = normalized.to_radians();
    (rad.cos(), rad.sin())
}

/// Bounding box of a `width × height` rectangle rotated by `angle_degrees`.
///
/// Works on fractional sizes because the compositor scales afterwards and
/// rounds only once.
///
/// # Example
///
/// ```
/// use retouch_core::transform::compute_rotated_bounds;
///
/// let (w, h) = compute_rotated_bounds(100.0, 50.0, 90.0);
/// assert_eq!((w, h), (50.0, 100.0));
/// ```
pub fn compute_rotated_bounds(width: f64, height: f64, angle_degrees: f64) -> (f64, f64) {
    let (cos, sin) = rotation_trig(angle_degrees);
    let (cos, sin) = (cos.abs(), sin.abs());
    (width * cos + height * sin, width * sin + height * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(-1e-18), 0.0);
    }

    #[test]
    fn test_quarter_turn_trig_is_exact() {
        assert_eq!(rotation_trig(0.0), (1.0, 0.0));
        assert_eq!(rotation_trig(90.0), (0.0, 1.0));
        assert_eq!(rotation_trig(180.0), (-1.0, 0.0));
        assert_eq!(rotation_trig(270.0), (0.0, -1.0));
        assert_eq!(rotation_trig(-90.0), (0.0, -1.0));
    }

    #[test]
    fn test_90_degree_bounds_swap() {
        assert_eq!(compute_rotated_bounds(100.0, 50.0, 90.0), (50.0, 100.0));
        assert_eq!(compute_rotated_bounds(100.0, 50.0, 270.0), (50.0, 100.0));
    }

    #[test]
    fn test_180_degree_bounds_unchanged() {
        assert_eq!(compute_rotated_bounds(100.0, 50.0, 180.0), (100.0, 50.0));
    }

    #[test]
    fn test_45_degree_bounds() {
        let (w, h) = compute_rotated_bounds(100.0, 100.0, 45.0);
        assert!((w - 141.421).abs() < 0.01, "width was {}", w);
        assert!((h - 141.421).abs() < 0.01, "height was {}", h);
    }

    #[test]
    fn test_opposite_rotations_same_bounds() {
        let (w1, h1) = compute_rotated_bounds(100.0, 80.0, 30.0);
        let (w2, h2) = compute_rotated_bounds(100.0, 80.0, -30.0);
        assert!((w1 - w2).abs() < 1e-9);
        assert!((h1 - h2).abs() < 1e-9);
    }

    #[test]
    fn test_complementary_rotations_same_bounds() {
        let (w1, h1) = compute_rotated_bounds(100.0, 50.0, 30.0);
        let (w2, h2) = compute_rotated_bounds(100.0, 50.0, 150.0);
        assert!((w1 - w2).abs() < 1e-9);
        assert!((h1 - h2).abs() < 1e-9);
    }
}
