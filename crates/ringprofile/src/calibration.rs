//! Physical pixel calibration.

use serde::{Deserialize, Serialize};

use crate::error::{require_finite, require_positive, ProfileError};

const UNCALIBRATED_UNIT: &str = "pixel";

/// Mapping from pixel coordinates to physical distance units.
///
/// Pixel sizes are strictly positive. Values built through [`Calibration::new`]
/// are always valid; deserialized values should be checked with
/// [`Calibration::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Physical unit name, e.g. `"um"` or `"pixel"`.
    pub unit: String,
    /// Physical width of one pixel.
    pub pixel_width: f64,
    /// Physical height of one pixel.
    pub pixel_height: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::uncalibrated()
    }
}

impl Calibration {
    /// Build a calibration, rejecting non-positive pixel sizes.
    pub fn new(
        unit: impl Into<String>,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self, ProfileError> {
        let cal = Self {
            unit: unit.into(),
            pixel_width,
            pixel_height,
        };
        cal.validate()?;
        Ok(cal)
    }

    /// One unit per pixel on both axes.
    pub fn uncalibrated() -> Self {
        Self {
            unit: UNCALIBRATED_UNIT.to_string(),
            pixel_width: 1.0,
            pixel_height: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        require_positive("pixel_width", self.pixel_width)?;
        require_positive("pixel_height", self.pixel_height)?;
        Ok(())
    }

    /// Physical area covered by a single pixel.
    #[inline]
    pub fn pixel_area(&self) -> f64 {
        self.pixel_width * self.pixel_height
    }

    #[inline]
    pub fn is_isotropic(&self) -> bool {
        self.pixel_width == self.pixel_height
    }

    /// Convert a physical point to (fractional) pixel coordinates.
    pub fn physical_to_pixel(&self, xy: [f64; 2]) -> Result<[f64; 2], ProfileError> {
        let x = require_finite("center_x", xy[0])?;
        let y = require_finite("center_y", xy[1])?;
        Ok([x / self.pixel_width, y / self.pixel_height])
    }

    /// Convert pixel coordinates to a physical point.
    #[inline]
    pub fn pixel_to_physical(&self, xy: [f64; 2]) -> [f64; 2] {
        [xy[0] * self.pixel_width, xy[1] * self.pixel_height]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn rejects_non_positive_pixel_sizes() {
        let err = Calibration::new("um", 0.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(Calibration::new("um", 1.0, -0.5).is_err());
        assert!(Calibration::new("um", f64::NAN, 1.0).is_err());
    }

    #[test]
    fn converts_between_frames() {
        let cal = Calibration::new("um", 0.5, 0.25).unwrap();
        let px = cal.physical_to_pixel([5.0, 5.0]).unwrap();
        assert_abs_diff_eq!(px[0], 10.0);
        assert_abs_diff_eq!(px[1], 20.0);
        let back = cal.pixel_to_physical(px);
        assert_abs_diff_eq!(back[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(back[1], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cal.pixel_area(), 0.125);
        assert!(!cal.is_isotropic());
    }

    #[test]
    fn non_finite_center_is_rejected() {
        let cal = Calibration::uncalibrated();
        assert!(cal.physical_to_pixel([f64::NAN, 0.0]).is_err());
        assert!(cal.physical_to_pixel([0.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn deserialized_values_can_be_validated() {
        let cal: Calibration =
            serde_json::from_str(r#"{"unit":"mm","pixel_width":0.1,"pixel_height":0.0}"#)
                .unwrap();
        assert!(cal.validate().is_err());
    }
}
