//! Rounded-corner masking over an opaque background

use imageproc::drawing::draw_filled_rect_mut;
use imageproc::image::{Rgb, Rgba, RgbaImage};
use imageproc::rect::Rect;

use crate::error::SurfaceUnavailable;

// Subsamples per axis when measuring how much of a pixel the clip covers
const SUPERSAMPLE: u32 = 4;

/// Source of drawing surfaces for the masker
pub trait Surface: Send + Sync {
    fn acquire(&self, side: u32) -> Result<RgbaImage, SurfaceUnavailable>;
}

/// Plain in-memory RGBA buffers
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapSurface;

impl Surface for HeapSurface {
    fn acquire(&self, side: u32) -> Result<RgbaImage, SurfaceUnavailable> {
        let fits = (side as usize)
            .checked_mul(side as usize)
            .and_then(|n| n.checked_mul(4))
            .is_some();
        if side == 0 || !fits {
            return Err(SurfaceUnavailable { side });
        }
        Ok(RgbaImage::new(side, side))
    }
}

/// Square clip region with quarter-circle corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    side: f32,
    radius: f32,
}

impl RoundedRect {
    /// Radius is clamped to half the side, at which point the shape is a circle
    pub fn new(side: u32, radius: u32) -> Self {
        RoundedRect {
            side: side as f32,
            radius: radius.min(side / 2) as f32,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        if x < 0.0 || y < 0.0 || x > self.side || y > self.side {
            return false;
        }
        let r = self.radius;
        // Nearest point of the inner rectangle whose corners are the arc centers
        let cx = x.clamp(r, self.side - r);
        let cy = y.clamp(r, self.side - r);
        let (dx, dy) = (x - cx, y - cy);
        dx * dx + dy * dy <= r * r
    }

    /// Fraction of pixel `(x, y)` inside the clip, 0.0 to 1.0
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        let step = 1.0 / SUPERSAMPLE as f32;
        let mut inside = 0;
        for sy in 0..SUPERSAMPLE {
            for sx in 0..SUPERSAMPLE {
                let px = x as f32 + (sx as f32 + 0.5) * step;
                let py = y as f32 + (sy as f32 + 0.5) * step;
                if self.contains(px, py) {
                    inside += 1;
                }
            }
        }
        inside as f32 / (SUPERSAMPLE * SUPERSAMPLE) as f32
    }
}

/// Composite `square` inside a rounded rectangle on a background-filled surface
///
/// Output is fully opaque: outside the clip is pure background, inside is the
/// source blended over the background by its own alpha.
pub fn mask(
    square: &RgbaImage,
    radius: u32,
    background: Rgb<u8>,
    surface: &impl Surface,
) -> Result<RgbaImage, SurfaceUnavailable> {
    let side = square.width();
    let mut dst = surface.acquire(side)?;
    if side == 0 || dst.dimensions() != square.dimensions() {
        return Err(SurfaceUnavailable { side });
    }

    let [r, g, b] = background.0;
    draw_filled_rect_mut(
        &mut dst,
        Rect::at(0, 0).of_size(side, side),
        Rgba([r, g, b, 255]),
    );

    let shape = RoundedRect::new(side, radius);
    for (x, y, pixel) in dst.enumerate_pixels_mut() {
        let coverage = shape.coverage(x, y);
        if coverage > 0.0 {
            *pixel = blend(*square.get_pixel(x, y), background, coverage);
        }
    }

    Ok(dst)
}

/// Drop alpha by compositing over the background, corners stay square
pub fn flatten(mut square: RgbaImage, background: Rgb<u8>) -> RgbaImage {
    for pixel in square.pixels_mut() {
        *pixel = blend(*pixel, background, 1.0);
    }
    square
}

#[inline]
fn blend(src: Rgba<u8>, background: Rgb<u8>, coverage: f32) -> Rgba<u8> {
    let alpha = src[3] as f32 / 255.0 * coverage;
    let mix = |fg: u8, bg: u8| (fg as f32 * alpha + bg as f32 * (1.0 - alpha)).round() as u8;
    Rgba([
        mix(src[0], background[0]),
        mix(src[1], background[1]),
        mix(src[2], background[2]),
        255,
    ])
}
