//! High-level profiling API.
//!
//! [`RadialProfiler`] is the primary entry point. It wraps a [`ProfileConfig`],
//! validates parameters before the image is touched, optionally runs the
//! median pre-filter, then generates the ring geometry and aggregates.

use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, AggregateOptions, RadialMetric, RingResult};
use crate::calibration::Calibration;
use crate::error::{require_positive, ProfileError};
use crate::geometry::{generate, RingGeometry};
use crate::grid::ImageGrid;
use crate::smoothing::{MedianSmoother, Smoother};

const CONFIG_SCHEMA_V1: &str = "ringprofile.config.v1";

const DEFAULT_MAX_RADIUS: f64 = 50.0;
const DEFAULT_RING_WIDTH: f64 = 5.0;

/// Parameters for one profiling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Outer radius of the profiled region (physical units).
    pub max_radius: f64,
    /// Width of each ring (physical units).
    pub ring_width: f64,
    pub calibration: Calibration,
    /// Median pre-filter radius in pixels; `None` or 0 disables it.
    pub median_radius_px: Option<u32>,
    pub metric: RadialMetric,
    /// Allow the aggregation pass to use the rayon pool.
    pub parallel: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            max_radius: DEFAULT_MAX_RADIUS,
            ring_width: DEFAULT_RING_WIDTH,
            calibration: Calibration::uncalibrated(),
            median_radius_px: None,
            metric: RadialMetric::Pixel,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileConfigFileV1 {
    schema: String,
    #[serde(flatten)]
    config: ProfileConfig,
}

impl ProfileConfig {
    /// Check radii and calibration without building rings.
    pub fn validate(&self) -> Result<(), ProfileError> {
        require_positive("max_radius", self.max_radius)?;
        require_positive("ring_width", self.ring_width)?;
        self.calibration.validate()
    }

    fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            metric: self.metric,
            parallel: self.parallel,
        }
    }

    /// Load a config from a JSON file tagged with the v1 schema.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let file: ProfileConfigFileV1 = serde_json::from_str(data)?;
        if file.schema != CONFIG_SCHEMA_V1 {
            return Err(format!(
                "unsupported config schema '{}' (expected '{}')",
                file.schema, CONFIG_SCHEMA_V1
            )
            .into());
        }
        file.config.validate()?;
        Ok(file.config)
    }

    /// Serialize to pretty JSON with the schema tag.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ProfileConfigFileV1 {
            schema: CONFIG_SCHEMA_V1.to_string(),
            config: self.clone(),
        })
    }

    pub fn to_json_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// Result of one profiling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialProfile {
    /// Physical unit of distances and areas.
    pub unit: String,
    /// Center in pixel coordinates.
    pub center_px: [f64; 2],
    /// Requested maximum radius (physical units).
    pub max_radius: f64,
    /// Ring width (physical units).
    pub ring_width: f64,
    /// One entry per ring, innermost first.
    pub rings: Vec<RingResult>,
}

impl RadialProfile {
    /// Ring mid distances (plot x axis).
    pub fn distances(&self) -> Vec<f64> {
        self.rings.iter().map(|r| r.distance).collect()
    }

    /// Ring mean intensities (plot y axis); NaN marks empty rings.
    pub fn mean_intensities(&self) -> Vec<f64> {
        self.rings.iter().map(|r| r.mean_intensity).collect()
    }

    pub fn total_pixel_count(&self) -> u64 {
        self.rings.iter().map(|r| r.pixel_count).sum()
    }

    /// Indices of rings that received no pixels.
    pub fn empty_rings(&self) -> Vec<usize> {
        self.rings
            .iter()
            .filter(|r| r.is_empty())
            .map(|r| r.index)
            .collect()
    }
}

/// Primary profiling interface.
///
/// Create once, profile many images or centers.
///
/// # Examples
///
/// ```
/// use ringprofile::{IntensityGrid, ProfileConfig, RadialProfiler};
///
/// let profiler = RadialProfiler::new(ProfileConfig {
///     max_radius: 10.0,
///     ring_width: 2.0,
///     ..Default::default()
/// });
/// let image = IntensityGrid::uniform(20, 20, 100.0);
/// let profile = profiler.profile(&image, [10.0, 10.0]).unwrap();
/// assert_eq!(profile.rings.len(), 5);
/// assert!(profile.rings.iter().all(|r| r.mean_intensity == 100.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RadialProfiler {
    config: ProfileConfig,
}

impl RadialProfiler {
    pub fn new(config: ProfileConfig) -> Self {
        Self { config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Mutable access to configuration for reruns with new parameters.
    pub fn config_mut(&mut self) -> &mut ProfileConfig {
        &mut self.config
    }

    /// Ring partition for the current configuration.
    pub fn geometry(&self) -> Result<RingGeometry, ProfileError> {
        generate(
            self.config.max_radius,
            self.config.ring_width,
            &self.config.calibration,
        )
    }

    /// Profile `image` around a center given in physical units.
    pub fn profile<G: ImageGrid + ?Sized>(
        &self,
        image: &G,
        center: [f64; 2],
    ) -> Result<RadialProfile, ProfileError> {
        let center_px = self.config.calibration.physical_to_pixel(center)?;
        self.profile_px(image, center_px)
    }

    /// Profile `image` around a center given in pixel coordinates.
    pub fn profile_px<G: ImageGrid + ?Sized>(
        &self,
        image: &G,
        center_px: [f64; 2],
    ) -> Result<RadialProfile, ProfileError> {
        let geometry = self.geometry()?;
        self.profile_with_geometry(image, center_px, &geometry)
    }

    fn profile_with_geometry<G: ImageGrid + ?Sized>(
        &self,
        image: &G,
        center_px: [f64; 2],
        geometry: &RingGeometry,
    ) -> Result<RadialProfile, ProfileError> {
        tracing::debug!(
            "profiling {} rings of {:.4} {} ({:.3} px) around ({:.2}, {:.2}) px",
            geometry.len(),
            geometry.ring_width(),
            self.config.calibration.unit,
            geometry.ring_width_px(),
            center_px[0],
            center_px[1],
        );
        if !self.config.calibration.is_isotropic() && self.config.metric == RadialMetric::Pixel {
            tracing::warn!(
                "pixel size {}x{} is not square; pixel-space rings are ellipses in physical space",
                self.config.calibration.pixel_width,
                self.config.calibration.pixel_height
            );
        }

        let rings = aggregate(
            image,
            center_px,
            geometry,
            &self.config.calibration,
            &self.config.aggregate_options(),
        )?;

        Ok(RadialProfile {
            unit: self.config.calibration.unit.clone(),
            center_px,
            max_radius: self.config.max_radius,
            ring_width: self.config.ring_width,
            rings,
        })
    }

    /// Profile an 8-bit image, applying the configured median pre-filter.
    pub fn profile_gray(
        &self,
        image: &GrayImage,
        center: [f64; 2],
    ) -> Result<RadialProfile, ProfileError> {
        self.profile_smoothed(image, center, &MedianSmoother)
    }

    /// Profile after running `smoother` with the configured radius.
    ///
    /// Parameters and the image are validated before the filter runs.
    pub fn profile_smoothed<I, S>(
        &self,
        image: &I,
        center: [f64; 2],
        smoother: &S,
    ) -> Result<RadialProfile, ProfileError>
    where
        I: ImageGrid,
        S: Smoother<I> + ?Sized,
    {
        let geometry = self.geometry()?;
        let center_px = self.config.calibration.physical_to_pixel(center)?;
        if image.is_empty() {
            return Err(ProfileError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        match self.config.median_radius_px {
            Some(r) if r > 0 => {
                tracing::debug!("median pre-filter, radius {} px", r);
                let smoothed = smoother.filter(image, r);
                self.profile_with_geometry(&smoothed, center_px, &geometry)
            }
            _ => self.profile_with_geometry(image, center_px, &geometry),
        }
    }
}
