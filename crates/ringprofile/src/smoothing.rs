//! Optional pre-smoothing applied before ring aggregation.

use image::GrayImage;

/// Image filter run ahead of the aggregator.
///
/// Implementations must return an image with the input's dimensions.
pub trait Smoother<I> {
    fn filter(&self, image: &I, radius_px: u32) -> I;
}

/// Square-window median filter backed by `imageproc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedianSmoother;

impl Smoother<GrayImage> for MedianSmoother {
    fn filter(&self, image: &GrayImage, radius_px: u32) -> GrayImage {
        if radius_px == 0 {
            return image.clone();
        }
        imageproc::filter::median_filter(image, radius_px, radius_px)
    }
}
