//! Ring geometry: contiguous concentric rings from a maximum radius and width.
//!
//! Ring `i` covers `[i * w, (i + 1) * w)` in pixel units, where `w` is the ring
//! width converted with the calibration's pixel width. The last ring is closed
//! on its outer side so a pixel sitting exactly at the maximum radius is kept.
//! Ring 0 is a filled disk.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::{require_positive, ProfileError};

/// Upper bound on the number of rings in one partition.
pub const MAX_RINGS: usize = 1 << 20;

/// Relative distance from an integer within which `max_radius / ring_width`
/// is treated as that integer.
const RATIO_SNAP_REL: f64 = 1e-12;

/// One ring of the partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    /// Ring index, 0 at the center.
    pub index: usize,
    /// Inner boundary in pixels (0 for the central disk).
    pub inner_radius_px: f64,
    /// Outer boundary in pixels.
    pub outer_radius_px: f64,
    /// Mid radius in physical units.
    pub mid_distance: f64,
}

impl RingSpec {
    /// Ring width in pixels.
    #[inline]
    pub fn width_px(&self) -> f64 {
        self.outer_radius_px - self.inner_radius_px
    }
}

/// Ordered, gap-free set of rings produced by [`generate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingGeometry {
    rings: Vec<RingSpec>,
    ring_width: f64,
    ring_width_px: f64,
}

/// Build the ring partition for `max_radius` and `ring_width` (physical units).
///
/// `floor(max_radius / ring_width)` rings are produced; when that is zero the
/// call fails instead of returning an empty partition, and more than
/// [`MAX_RINGS`] is rejected the same way. A ratio within round-off of an
/// integer counts as that integer, so `generate(0.3, 0.1, ..)` yields 3 rings
/// although `0.3 / 0.1` evaluates to `2.9999999999999996`.
pub fn generate(
    max_radius: f64,
    ring_width: f64,
    calibration: &Calibration,
) -> Result<RingGeometry, ProfileError> {
    let max_radius = require_positive("max_radius", max_radius)?;
    let ring_width = require_positive("ring_width", ring_width)?;
    calibration.validate()?;

    let n_rings = ring_count(max_radius / ring_width);
    if !n_rings.is_finite() {
        return Err(ProfileError::NonFinite {
            name: "max_radius / ring_width",
            value: n_rings,
        });
    }
    if n_rings < 1.0 {
        return Err(ProfileError::NoRings {
            max_radius,
            ring_width,
        });
    }
    if n_rings > MAX_RINGS as f64 {
        return Err(ProfileError::TooManyRings {
            count: n_rings,
            limit: MAX_RINGS,
        });
    }
    let n_rings = n_rings as usize;

    let ring_width_px = ring_width / calibration.pixel_width;
    let rings = (0..n_rings)
        .map(|i| {
            let inner_radius_px = i as f64 * ring_width_px;
            let outer_radius_px = (i + 1) as f64 * ring_width_px;
            RingSpec {
                index: i,
                inner_radius_px,
                outer_radius_px,
                mid_distance: 0.5 * (inner_radius_px + outer_radius_px) * calibration.pixel_width,
            }
        })
        .collect();

    Ok(RingGeometry {
        rings,
        ring_width,
        ring_width_px,
    })
}

fn ring_count(ratio: f64) -> f64 {
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= ratio * RATIO_SNAP_REL {
        nearest
    } else {
        ratio.floor()
    }
}

impl RingGeometry {
    /// Rings in index order.
    #[inline]
    pub fn rings(&self) -> &[RingSpec] {
        &self.rings
    }

    /// Number of rings (always at least one).
    #[inline]
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Ring width in physical units.
    #[inline]
    pub fn ring_width(&self) -> f64 {
        self.ring_width
    }

    /// Ring width in pixels.
    #[inline]
    pub fn ring_width_px(&self) -> f64 {
        self.ring_width_px
    }

    /// Outer boundary of the last ring in pixels.
    #[inline]
    pub fn outer_radius_px(&self) -> f64 {
        self.rings.last().map_or(0.0, |r| r.outer_radius_px)
    }

    /// Ring containing a point at distance `d_px` from the center.
    ///
    /// Intervals are `[inner, outer)` except for the last ring, which is
    /// `[inner, outer]`. Returns `None` beyond the outer boundary.
    pub fn bin_index(&self, d_px: f64) -> Option<usize> {
        let last = self.rings.len().checked_sub(1)?;
        if !(d_px >= 0.0) || d_px > self.rings[last].outer_radius_px {
            return None;
        }

        // The quotient can land one bin off near a boundary; settle against the
        // stored boundaries so membership matches `rings()` exactly.
        let mut i = ((d_px / self.ring_width_px).floor() as usize).min(last);
        if i > 0 && d_px < self.rings[i].inner_radius_px {
            i -= 1;
        } else if i < last && d_px >= self.rings[i].outer_radius_px {
            i += 1;
        }
        Some(i)
    }
}
