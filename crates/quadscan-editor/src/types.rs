//! Shared geometry types for the selection editor.
//!
//! Points are tagged with the coordinate space they live in so that
//! display, canvas, and source-image coordinates cannot be mixed without
//! going through a [`CoordinateMapper`](crate::CoordinateMapper).

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Marker trait for a coordinate space.
pub trait Space: Copy + fmt::Debug + PartialEq + 'static {
    /// Short name used in debug output.
    const NAME: &'static str;
}

/// On-screen pixels of the rendered canvas element (CSS pixels,
/// relative to the element's top-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySpace;

/// The fixed internal pixel grid of the selection canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSpace;

/// The native pixel grid of the uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpace;

impl Space for DisplaySpace {
    const NAME: &'static str = "display";
}

impl Space for CanvasSpace {
    const NAME: &'static str = "canvas";
}

impl Space for SourceSpace {
    const NAME: &'static str = "source";
}

/// A 2D point in coordinate space `S`.
#[derive(Clone, Copy, PartialEq)]
pub struct Point<S: Space> {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
    space: PhantomData<S>,
}

/// A point in display space.
pub type DisplayPoint = Point<DisplaySpace>;
/// A point in canvas space.
pub type CanvasPoint = Point<CanvasSpace>;
/// A point in source-image space.
pub type SourcePoint = Point<SourceSpace>;

impl<S: Space> Point<S> {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    /// Squared Euclidean distance to another point in the same space.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point in the same space.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// `[x, y]` pair, the shape used on the wire.
    #[must_use]
    pub const fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl<S: Space> fmt::Debug for Point<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", S::NAME, self.x, self.y)
    }
}

impl CanvasPoint {
    /// Clamp into `[0, width] × [0, height]`.
    ///
    /// Infinities land on the matching edge; NaN clamps to 0.
    #[must_use]
    pub fn clamp_to(self, bounds: Dimensions) -> Self {
        let clamp_axis = |v: f64, max: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, max) };
        Self::new(
            clamp_axis(self.x, f64::from(bounds.width)),
            clamp_axis(self.y, f64::from(bounds.height)),
        )
    }

    /// Quantize both axes to the nearest multiple of `step`.
    #[must_use]
    pub fn snap(self, step: f64) -> Self {
        if step <= 0.0 || !step.is_finite() {
            return self;
        }
        Self::new((self.x / step).round() * step, (self.y / step).round() * step)
    }
}

/// Pixel grid dimensions (canvas or source image).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Size of the on-screen box the canvas is rendered into.
///
/// Fractional because layout and CSS scaling are not pixel aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

impl DisplaySize {
    /// Create a new display size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether the size can be used as a scale denominator.
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl From<Dimensions> for DisplaySize {
    fn from(d: Dimensions) -> Self {
        Self::new(f64::from(d.width), f64::from(d.height))
    }
}
