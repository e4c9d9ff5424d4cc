//! Ring outlines drawn over the source image.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut};

use crate::geometry::RingGeometry;

const RING_COLOR: Rgb<u8> = Rgb([255, 220, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 40, 40]);

/// Promote `image` to RGB and draw every ring's outer boundary plus a center
/// cross. Radii are rounded to whole pixels, so this is for inspection only.
pub fn draw_ring_overlay(
    image: &GrayImage,
    center_px: [f64; 2],
    geometry: &RingGeometry,
) -> RgbImage {
    let mut canvas = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y)[0];
        Rgb([v, v, v])
    });
    let center = (center_px[0].round() as i32, center_px[1].round() as i32);
    for ring in geometry.rings() {
        let r = ring.outer_radius_px.round().max(1.0) as i32;
        draw_hollow_circle_mut(&mut canvas, center, r, RING_COLOR);
    }
    draw_cross_mut(&mut canvas, CENTER_COLOR, center.0, center.1);
    canvas
}
