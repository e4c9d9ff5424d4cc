//! Read-only intensity grids consumed by the aggregator.

use std::ops::Deref;

use image::{ImageBuffer, Luma, Primitive};

use crate::error::ProfileError;

/// Scalar intensity lookup over a `width x height` pixel grid.
///
/// Implementations must be cheap to query and must not change while a
/// profile is being computed. `intensity` is only called with in-bounds
/// coordinates.
///
/// # Example
///
/// ```
/// use ringprofile::ImageGrid;
///
/// struct Ramp;
///
/// impl ImageGrid for Ramp {
///     fn width(&self) -> u32 { 8 }
///     fn height(&self) -> u32 { 8 }
///     fn intensity(&self, x: u32, _y: u32) -> f64 { x as f64 }
/// }
///
/// assert!(!Ramp.is_empty());
/// ```
pub trait ImageGrid: Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Intensity of pixel `(x, y)`.
    fn intensity(&self, x: u32, y: u32) -> f64;

    /// `true` when the grid has no pixels.
    fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl<T, C> ImageGrid for ImageBuffer<Luma<T>, C>
where
    T: Primitive + Into<f64> + Sync,
    C: Deref<Target = [T]> + Sync,
{
    #[inline]
    fn width(&self) -> u32 {
        ImageBuffer::width(self)
    }

    #[inline]
    fn height(&self) -> u32 {
        ImageBuffer::height(self)
    }

    #[inline]
    fn intensity(&self, x: u32, y: u32) -> f64 {
        self.get_pixel(x, y)[0].into()
    }
}

/// Owned row-major grid of `f64` intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityGrid {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl IntensityGrid {
    /// Wrap a row-major buffer; its length must be `width * height`.
    pub fn new(width: u32, height: u32, data: Vec<f64>) -> Result<Self, ProfileError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(ProfileError::GridSizeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f64) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Grid filled with a single value.
    pub fn uniform(width: u32, height: u32, value: f64) -> Self {
        Self::from_fn(width, height, |_, _| value)
    }

    /// Row-major samples.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl ImageGrid for IntensityGrid {
    #[inline]
    fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn intensity(&self, x: u32, y: u32) -> f64 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}
