/// Size specs and their resolution to concrete pixel dimensions.
///
/// A ratio spec follows the viewport: it is resolved to a power of two
/// biased towards the larger neighbour for small sizes, never exceeding the
/// largest power of two that fits in the viewport.

use serde::{Deserialize, Serialize};
use winit::dpi::PhysicalSize;
use crate::graphics_device::Extent2D;

/// Requested size of a render target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizeSpec {
    /// Square target, `size` x `size`
    Square(u32),
    /// Explicit width and height
    Explicit { width: u32, height: u32 },
    /// Fraction of the main viewport, recomputed when the viewport resizes
    Ratio(f32),
}

impl SizeSpec {
    /// Whether the resolved size depends on the viewport
    pub fn is_ratio(&self) -> bool {
        matches!(self, SizeSpec::Ratio(_))
    }

    /// Resolve against the current viewport size
    pub fn resolve(&self, viewport: PhysicalSize<u32>) -> Extent2D {
        match *self {
            SizeSpec::Square(size) => Extent2D::square(size),
            SizeSpec::Explicit { width, height } => Extent2D::new(width, height),
            SizeSpec::Ratio(ratio) => Extent2D::new(
                best_reflection_dimension(viewport.width, ratio),
                best_reflection_dimension(viewport.height, ratio),
            ),
        }
    }

    /// Same spec with every dimension multiplied by `ratio`
    pub fn scaled(&self, ratio: f32) -> SizeSpec {
        match *self {
            SizeSpec::Square(size) => SizeSpec::Square(scale_dimension(size, ratio)),
            SizeSpec::Explicit { width, height } => SizeSpec::Explicit {
                width: scale_dimension(width, ratio),
                height: scale_dimension(height, ratio),
            },
            SizeSpec::Ratio(r) => SizeSpec::Ratio(r * ratio),
        }
    }
}

impl From<Extent2D> for SizeSpec {
    fn from(extent: Extent2D) -> Self {
        if extent.width == extent.height {
            SizeSpec::Square(extent.width)
        } else {
            SizeSpec::Explicit { width: extent.width, height: extent.height }
        }
    }
}

fn scale_dimension(size: u32, ratio: f32) -> u32 {
    ((size as f32 * ratio).max(1.0)) as u32
}

/// Largest power of two <= `value` (1 for 0)
pub fn floor_pot(value: u32) -> u32 {
    if value <= 1 {
        1
    } else {
        1 << (31 - value.leading_zeros())
    }
}

/// Power of two nearest to `value`, the larger one on ties
pub fn nearest_pot(value: f32) -> u32 {
    let value = value.max(1.0);
    let floor = floor_pot(value as u32);
    let ceil = if (floor as f32) < value { floor.saturating_mul(2) } else { floor };
    if (ceil as f32 - value) > (value - floor as f32) {
        floor
    } else {
        ceil
    }
}

/// Texture dimension for a target covering `ratio` of `render_dimension` pixels
pub fn best_reflection_dimension(render_dimension: u32, ratio: f32) -> u32 {
    const BIAS: f32 = 128.0 * 128.0;

    let dimension = (render_dimension as f32 * ratio).floor().max(0.0);
    let biased = dimension + BIAS / (128.0 + dimension);
    nearest_pot(biased).min(floor_pot(render_dimension)).max(1)
}

#[cfg(test)]
#[path = "size_resolver_tests.rs"]
mod tests;
