//! ringprofile — radial intensity profiles around a chosen image center.
//!
//! The plane around the center is partitioned into concentric rings of fixed
//! width. For each ring the crate reports the mean intensity, the measured
//! area, the mid-ring distance and the pixel count. Typical uses are
//! point-spread functions, diffusion halos and other radially symmetric
//! signals.
//!
//! The pipeline stages are:
//!
//! 1. **Geometry** – contiguous ring boundaries from a maximum radius, a ring
//!    width and the pixel calibration ([`generate`]).
//! 2. **Smoothing** – optional median pre-filter ([`MedianSmoother`]).
//! 3. **Aggregation** – one pass over the clipped bounding square, binning
//!    pixels by distance ([`aggregate`]).
//! 4. **Presentation** – CSV / text tables ([`table`]) and ring overlays
//!    ([`draw_ring_overlay`]).
//!
//! # Public API
//! - [`RadialProfiler`] and [`ProfileConfig`] as primary entry points
//! - [`generate`] and [`aggregate`] for direct use of the two stages
//! - [`ImageGrid`] to profile any intensity source

mod aggregate;
mod calibration;
mod error;
mod geometry;
mod grid;
mod overlay;
mod profile;
mod roi;
mod smoothing;
pub mod table;
#[cfg(test)]
mod test_utils;

pub use aggregate::{aggregate, AggregateOptions, RadialMetric, RingResult};
pub use calibration::Calibration;
pub use error::{ErrorKind, ProfileError};
pub use geometry::{generate, RingGeometry, RingSpec, MAX_RINGS};
pub use grid::{ImageGrid, IntensityGrid};
pub use overlay::draw_ring_overlay;
pub use profile::{ProfileConfig, RadialProfile, RadialProfiler};
pub use roi::RectRoi;
pub use smoothing::{MedianSmoother, Smoother};
