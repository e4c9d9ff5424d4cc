//! Rectangular selection used to seed the profile center.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;

/// Axis-aligned selection in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectRoi {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectRoi {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle center in pixel coordinates.
    pub fn center_px(&self) -> [f64; 2] {
        [self.x + 0.5 * self.width, self.y + 0.5 * self.height]
    }

    /// Rectangle center in physical units.
    pub fn center_physical(&self, calibration: &Calibration) -> [f64; 2] {
        calibration.pixel_to_physical(self.center_px())
    }
}
