//! Synthetic grids shared by unit tests.

use image::{GrayImage, Luma};

use crate::grid::IntensityGrid;

/// Number of pixels of a `w x h` image within distance `r` (closed) of `center`.
pub(crate) fn count_within(w: u32, h: u32, center: [f64; 2], r: f64) -> u64 {
    let mut n = 0u64;
    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - center[0];
            let dy = y as f64 - center[1];
            if (dx * dx + dy * dy).sqrt() <= r {
                n += 1;
            }
        }
    }
    n
}

/// Grid whose intensity equals the pixel's distance from `center`.
pub(crate) fn radial_ramp(w: u32, h: u32, center: [f64; 2]) -> IntensityGrid {
    IntensityGrid::from_fn(w, h, |x, y| {
        let dx = x as f64 - center[0];
        let dy = y as f64 - center[1];
        (dx * dx + dy * dy).sqrt()
    })
}

/// 8-bit Gaussian spot with peak `peak` over a zero background.
pub(crate) fn gaussian_spot(w: u32, h: u32, center: [f32; 2], sigma: f32, peak: u8) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    let inv = 1.0 / (2.0 * sigma * sigma);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            let v = peak as f32 * (-(dx * dx + dy * dy) * inv).exp();
            img.put_pixel(x, y, Luma([v.round() as u8]));
        }
    }
    img
}
