//! Single-pass radial aggregation of pixel intensities into ring bins.
//!
//! The pass visits the bounding square of the outermost ring, clipped to the
//! image, and assigns each pixel to a ring by its distance from the center.
//! Work is split into fixed-height row bands with private accumulators that are
//! merged in band order, so serial and parallel runs produce identical sums.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::{require_finite, ProfileError};
use crate::geometry::RingGeometry;
use crate::grid::ImageGrid;

/// Rows per accumulation band.
const BAND_ROWS: u32 = 32;

/// Minimum number of bands before the pass is handed to rayon.
const PARALLEL_MIN_BANDS: usize = 4;

/// How pixel offsets are turned into a radial distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadialMetric {
    /// Euclidean distance in pixel units; assumes square pixels.
    #[default]
    Pixel,
    /// Physical Euclidean distance expressed in pixel-width units, so rings
    /// stay circular in physical space when pixels are not square.
    Physical,
}

/// Knobs for [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub metric: RadialMetric,
    /// Allow the banded pass to run on the rayon pool.
    pub parallel: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            metric: RadialMetric::Pixel,
            parallel: true,
        }
    }
}

/// Aggregated statistics for one ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingResult {
    /// Ring index, 0 at the center.
    pub index: usize,
    /// Mid radius of the ring in physical units.
    pub distance: f64,
    /// Mean intensity; NaN when no pixel fell into the ring (`null` in JSON).
    #[serde(with = "nan_as_null")]
    pub mean_intensity: f64,
    /// Measured area (`pixel_count * pixel_width * pixel_height`).
    pub area: f64,
    pub pixel_count: u64,
    /// Smallest intensity seen; NaN when empty.
    #[serde(with = "nan_as_null")]
    pub min_intensity: f64,
    /// Largest intensity seen; NaN when empty.
    #[serde(with = "nan_as_null")]
    pub max_intensity: f64,
}

/// Serde adapter writing NaN as `null` and reading `null` back as NaN.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

impl RingResult {
    /// `true` when no pixel was assigned to this ring.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixel_count == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct RingAccumulator {
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

impl Default for RingAccumulator {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RingAccumulator {
    #[inline]
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    #[inline]
    fn merge(&mut self, other: &Self) {
        self.sum += other.sum;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let mean = self.sum / self.count as f64;
        // Clamping keeps a uniform ring exactly at its value despite round-off.
        if self.min <= self.max {
            mean.clamp(self.min, self.max)
        } else {
            mean
        }
    }
}

/// Inclusive pixel window `[x0, x1] x [y0, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelWindow {
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
}

impl PixelWindow {
    /// Box of half-extents `half_x`, `half_y` around `center`, clipped to
    /// `width x height`. Returns `None` when the box misses the image.
    fn clipped(
        center: [f64; 2],
        half_x: f64,
        half_y: f64,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let clip = |lo: f64, hi: f64, size: u32| -> Option<(u32, u32)> {
            let lo = lo.floor().max(0.0);
            let hi = hi.ceil().min(size as f64 - 1.0);
            if lo > hi {
                return None;
            }
            Some((lo as u32, hi as u32))
        };
        let (x0, x1) = clip(center[0] - half_x, center[0] + half_x, width)?;
        let (y0, y1) = clip(center[1] - half_y, center[1] + half_y, height)?;
        Some(Self { x0, x1, y0, y1 })
    }

    fn n_rows(&self) -> u32 {
        self.y1 - self.y0 + 1
    }
}

/// Accumulate per-ring intensity statistics around `center_px`.
///
/// `center_px` is in pixel coordinates and may lie outside the image; rings
/// that fall off the grid come back with `pixel_count == 0` and a NaN mean.
/// The result has one entry per ring of `geometry`, in ring order.
pub fn aggregate<G: ImageGrid + ?Sized>(
    image: &G,
    center_px: [f64; 2],
    geometry: &RingGeometry,
    calibration: &Calibration,
    options: &AggregateOptions,
) -> Result<Vec<RingResult>, ProfileError> {
    require_finite("center_x", center_px[0])?;
    require_finite("center_y", center_px[1])?;
    calibration.validate()?;
    if image.is_empty() {
        return Err(ProfileError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }

    let n_rings = geometry.len();
    let acc = match window_for(center_px, geometry, calibration, options.metric, image) {
        Some(window) => accumulate(image, center_px, geometry, calibration, options, window),
        None => {
            tracing::debug!(
                "ring window around ({:.2}, {:.2}) misses the {}x{} image",
                center_px[0],
                center_px[1],
                image.width(),
                image.height()
            );
            vec![RingAccumulator::default(); n_rings]
        }
    };

    let pixel_area = calibration.pixel_area();
    let results: Vec<RingResult> = geometry
        .rings()
        .iter()
        .zip(&acc)
        .map(|(ring, a)| {
            let empty = a.count == 0;
            RingResult {
                index: ring.index,
                distance: ring.mid_distance,
                mean_intensity: a.mean(),
                area: a.count as f64 * pixel_area,
                pixel_count: a.count,
                min_intensity: if empty { f64::NAN } else { a.min },
                max_intensity: if empty { f64::NAN } else { a.max },
            }
        })
        .collect();

    let n_empty = results.iter().filter(|r| r.is_empty()).count();
    if n_empty > 0 {
        tracing::debug!("{} of {} rings received no pixels", n_empty, n_rings);
    }
    Ok(results)
}

fn window_for<G: ImageGrid + ?Sized>(
    center_px: [f64; 2],
    geometry: &RingGeometry,
    calibration: &Calibration,
    metric: RadialMetric,
    image: &G,
) -> Option<PixelWindow> {
    let r = geometry.outer_radius_px();
    // Under the physical metric the y reach shrinks or grows with the aspect.
    let half_y = match metric {
        RadialMetric::Pixel => r,
        RadialMetric::Physical => r * calibration.pixel_width / calibration.pixel_height,
    };
    PixelWindow::clipped(center_px, r, half_y, image.width(), image.height())
}

fn accumulate<G: ImageGrid + ?Sized>(
    image: &G,
    center_px: [f64; 2],
    geometry: &RingGeometry,
    calibration: &Calibration,
    options: &AggregateOptions,
    window: PixelWindow,
) -> Vec<RingAccumulator> {
    let n_rings = geometry.len();
    let n_bands = window.n_rows().div_ceil(BAND_ROWS) as usize;
    // Squared y scale in pixel-width units.
    let sy2 = match options.metric {
        RadialMetric::Pixel => 1.0,
        RadialMetric::Physical => {
            let s = calibration.pixel_height / calibration.pixel_width;
            s * s
        }
    };

    let run_band = |band: usize| -> Vec<RingAccumulator> {
        let mut acc = vec![RingAccumulator::default(); n_rings];
        let y_start = window.y0 + band as u32 * BAND_ROWS;
        let y_end = (y_start + BAND_ROWS - 1).min(window.y1);
        for y in y_start..=y_end {
            let dy = y as f64 - center_px[1];
            let dy2 = dy * dy * sy2;
            for x in window.x0..=window.x1 {
                let dx = x as f64 - center_px[0];
                let d = (dx * dx + dy2).sqrt();
                if let Some(i) = geometry.bin_index(d) {
                    acc[i].push(image.intensity(x, y));
                }
            }
        }
        acc
    };

    let bands: Vec<Vec<RingAccumulator>> = if options.parallel && n_bands >= PARALLEL_MIN_BANDS {
        (0..n_bands).into_par_iter().map(run_band).collect()
    } else {
        (0..n_bands).map(run_band).collect()
    };

    let mut total = vec![RingAccumulator::default(); n_rings];
    for band in &bands {
        for (t, b) in total.iter_mut().zip(band) {
            t.merge(b);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::geometry::generate;
    use crate::grid::IntensityGrid;
    use crate::test_utils::{count_within, radial_ramp};
    use crate::ErrorKind;

    fn serial() -> AggregateOptions {
        AggregateOptions {
            parallel: false,
            ..Default::default()
        }
    }

    #[test]
    fn uniform_twenty_by_twenty_scenario() {
        let img = IntensityGrid::uniform(20, 20, 100.0);
        let cal = Calibration::uncalibrated();
        let g = generate(10.0, 2.0, &cal).unwrap();
        let res = aggregate(&img, [10.0, 10.0], &g, &cal, &serial()).unwrap();

        assert_eq!(res.len(), 5);
        for r in &res {
            assert!(r.pixel_count > 0);
            assert_eq!(r.mean_intensity, 100.0);
            assert_eq!(r.area, r.pixel_count as f64);
        }
        // Lattice points with dx^2 + dy^2 < 4.
        assert_eq!(res[0].pixel_count, 9);
        let total: u64 = res.iter().map(|r| r.pixel_count).sum();
        assert_eq!(total, count_within(20, 20, [10.0, 10.0], 10.0));
        // 317 lattice points in the closed disk of radius 10, minus (20, 10) and
        // (10, 20) which fall outside the image.
        assert_eq!(total, 315);
    }

    #[test]
    fn partition_counts_every_pixel_once() {
        let cal = Calibration::uncalibrated();
        let g = generate(17.5, 2.5, &cal).unwrap();
        for center in [[31.3, 22.7], [2.0, 3.5], [60.0, 40.0], [-5.2, 20.0]] {
            let img = IntensityGrid::uniform(64, 48, 1.0);
            let res = aggregate(&img, center, &g, &cal, &serial()).unwrap();
            let total: u64 = res.iter().map(|r| r.pixel_count).sum();
            assert_eq!(
                total,
                count_within(64, 48, center, g.outer_radius_px()),
                "center {center:?}"
            );
        }
    }

    #[test]
    fn pixels_on_a_boundary_go_outward_except_at_the_edge() {
        // Single-row image: distances along x are exact integers.
        let img = IntensityGrid::from_fn(11, 1, |x, _| x as f64);
        let cal = Calibration::uncalibrated();
        let g = generate(4.0, 2.0, &cal).unwrap();
        let res = aggregate(&img, [0.0, 0.0], &g, &cal, &serial()).unwrap();
        // Ring 0: x in {0, 1}; ring 1: x in {2, 3, 4} with x = 4 on the closed edge.
        assert_eq!(res[0].pixel_count, 2);
        assert_eq!(res[1].pixel_count, 3);
        assert_abs_diff_eq!(res[0].mean_intensity, 0.5);
        assert_abs_diff_eq!(res[1].mean_intensity, 3.0);
        assert_eq!(res[1].min_intensity, 2.0);
        assert_eq!(res[1].max_intensity, 4.0);
    }

    #[test]
    fn uniform_value_survives_round_off() {
        let img = IntensityGrid::uniform(80, 80, 0.1);
        let cal = Calibration::new("um", 0.3, 0.3).unwrap();
        let g = generate(9.0, 0.9, &cal).unwrap();
        let res = aggregate(&img, [40.0, 40.0], &g, &cal, &serial()).unwrap();
        for r in res.iter().filter(|r| !r.is_empty()) {
            assert_eq!(r.mean_intensity, 0.1);
        }
    }

    #[test]
    fn far_off_grid_center_yields_empty_rings_not_errors() {
        let img = IntensityGrid::uniform(20, 20, 7.0);
        let cal = Calibration::uncalibrated();
        let g = generate(40.0, 5.0, &cal).unwrap();
        let res = aggregate(&img, [-30.0, 10.0], &g, &cal, &serial()).unwrap();
        assert_eq!(res.len(), 8);
        for r in &res[..6] {
            assert_eq!(r.pixel_count, 0);
            assert!(r.mean_intensity.is_nan());
            assert!(r.min_intensity.is_nan());
            assert_eq!(r.area, 0.0);
        }
        assert!(res[6].pixel_count > 0);
        assert_eq!(res[6].mean_intensity, 7.0);

        let miss = aggregate(&img, [-500.0, -500.0], &g, &cal, &serial()).unwrap();
        assert!(miss.iter().all(|r| r.is_empty() && r.mean_intensity.is_nan()));
    }

    #[test]
    fn empty_image_is_invalid_input() {
        let img = IntensityGrid::uniform(0, 0, 0.0);
        let cal = Calibration::uncalibrated();
        let g = generate(4.0, 1.0, &cal).unwrap();
        let err = aggregate(&img, [0.0, 0.0], &g, &cal, &serial()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn non_finite_center_is_rejected() {
        let img = IntensityGrid::uniform(4, 4, 0.0);
        let cal = Calibration::uncalibrated();
        let g = generate(4.0, 1.0, &cal).unwrap();
        let err = aggregate(&img, [f64::NAN, 0.0], &g, &cal, &serial()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn repeated_and_parallel_runs_are_identical() {
        let mut rng = StdRng::seed_from_u64(7);
        let img = IntensityGrid::from_fn(300, 260, |_, _| rng.gen_range(0.0..4096.0));
        let cal = Calibration::new("um", 0.2, 0.2).unwrap();
        let g = generate(25.0, 1.5, &cal).unwrap();
        let center = [151.4, 127.9];

        let a = aggregate(&img, center, &g, &cal, &serial()).unwrap();
        let b = aggregate(&img, center, &g, &cal, &serial()).unwrap();
        let par = AggregateOptions {
            parallel: true,
            ..Default::default()
        };
        let c = aggregate(&img, center, &g, &cal, &par).unwrap();

        for ((x, y), z) in a.iter().zip(&b).zip(&c) {
            assert_eq!(x.pixel_count, y.pixel_count);
            assert_eq!(x.area, y.area);
            assert_eq!(x.mean_intensity.to_bits(), y.mean_intensity.to_bits());
            assert_eq!(x.pixel_count, z.pixel_count);
            assert_eq!(x.mean_intensity.to_bits(), z.mean_intensity.to_bits());
        }
    }

    #[test]
    fn radial_ramp_means_track_ring_midpoints() {
        let img = radial_ramp(101, 101, [50.0, 50.0]);
        let cal = Calibration::uncalibrated();
        let g = generate(40.0, 4.0, &cal).unwrap();
        let res = aggregate(&img, [50.0, 50.0], &g, &cal, &serial()).unwrap();
        // Area weighting pulls the mean slightly outward of the mid radius.
        for r in &res[2..] {
            assert_abs_diff_eq!(r.mean_intensity, r.distance, epsilon = 0.4);
        }
        for pair in res.windows(2) {
            assert!(pair[1].mean_intensity > pair[0].mean_intensity);
        }
    }

    #[test]
    fn area_uses_both_pixel_sizes() {
        let img = IntensityGrid::uniform(40, 40, 1.0);
        let cal = Calibration::new("mm", 0.5, 0.25).unwrap();
        let g = generate(4.0, 1.0, &cal).unwrap();
        let res = aggregate(&img, [20.0, 20.0], &g, &cal, &serial()).unwrap();
        for r in &res {
            assert_abs_diff_eq!(r.area, r.pixel_count as f64 * 0.125);
        }
    }

    #[test]
    fn physical_metric_matches_pixel_metric_for_square_pixels() {
        let mut rng = StdRng::seed_from_u64(11);
        let img = IntensityGrid::from_fn(64, 64, |_, _| rng.gen_range(0.0..1.0));
        let cal = Calibration::new("um", 0.4, 0.4).unwrap();
        let g = generate(10.0, 1.0, &cal).unwrap();
        let a = aggregate(&img, [30.5, 33.0], &g, &cal, &serial()).unwrap();
        let phys = AggregateOptions {
            metric: RadialMetric::Physical,
            parallel: false,
        };
        let b = aggregate(&img, [30.5, 33.0], &g, &cal, &phys).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn physical_metric_stretches_rows_for_tall_pixels() {
        // Pixels twice as tall as wide: one row step is two width units.
        let img = IntensityGrid::uniform(21, 21, 1.0);
        let cal = Calibration::new("um", 1.0, 2.0).unwrap();
        let g = generate(4.0, 2.0, &cal).unwrap();
        let phys = AggregateOptions {
            metric: RadialMetric::Physical,
            parallel: false,
        };
        let res = aggregate(&img, [10.0, 10.0], &g, &cal, &phys).unwrap();
        // Ring 0 (d < 2): dx in -1..=1 on the center row only.
        assert_eq!(res[0].pixel_count, 3);

        let pix = aggregate(&img, [10.0, 10.0], &g, &cal, &serial()).unwrap();
        assert_eq!(pix[0].pixel_count, 9);
    }
}
