//! Conversions between display, canvas, and source-image space.
//!
//! The canvas surface is sized once per loaded image (see
//! [`fit_canvas`]). The display box is whatever layout gives the canvas
//! element on screen and changes on every resize, so the mapper must be
//! told about it through [`CoordinateMapper::set_display_size`] before
//! pointer positions are converted. A stale display size is the classic
//! cause of corners landing a few pixels away from the pointer.

use crate::types::{CanvasPoint, Dimensions, DisplayPoint, DisplaySize, SourcePoint};

/// Compute the canvas surface for an image of `natural` size.
///
/// Images that fit inside `max` are used at their natural size. Larger
/// images are scaled uniformly by `min(max.w / w, max.h / h)`, truncated
/// to whole pixels (never below 1).
#[must_use]
pub fn fit_canvas(natural: Dimensions, max: Dimensions) -> Dimensions {
    if natural.width <= max.width && natural.height <= max.height {
        return natural;
    }
    let ratio = (f64::from(max.width) / f64::from(natural.width))
        .min(f64::from(max.height) / f64::from(natural.height));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scale = |v: u32| -> u32 {
        // Tolerate products like 599.9999999 that are really 600.
        let scaled = f64::from(v).mul_add(ratio, 1e-6).floor();
        (scaled as u32).max(1)
    };
    Dimensions::new(scale(natural.width), scale(natural.height))
}

/// Affine scale between the three coordinate spaces for one loaded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    source: Dimensions,
    canvas: Dimensions,
    display: DisplaySize,
}

impl CoordinateMapper {
    /// Build a mapper for an explicit source and canvas size.
    ///
    /// Zero-sized axes are treated as 1 pixel so every scale factor
    /// stays finite. The display box starts equal to the canvas size.
    #[must_use]
    pub fn new(source: Dimensions, canvas: Dimensions) -> Self {
        let non_zero = |d: Dimensions| Dimensions::new(d.width.max(1), d.height.max(1));
        let canvas = non_zero(canvas);
        Self {
            source: non_zero(source),
            canvas,
            display: canvas.into(),
        }
    }

    /// Build a mapper for a freshly loaded image of `natural` size.
    #[must_use]
    pub fn for_image(natural: Dimensions, max_canvas: Dimensions) -> Self {
        Self::new(natural, fit_canvas(natural, max_canvas))
    }

    /// Record the on-screen size of the canvas element.
    ///
    /// Returns `true` when the size changed. Unusable sizes (zero,
    /// negative, non-finite; e.g. while the element is hidden) are
    /// ignored and the previous size is kept.
    pub fn set_display_size(&mut self, display: DisplaySize) -> bool {
        if !display.is_usable() {
            log::debug!("ignoring unusable display size {display:?}");
            return false;
        }
        if display == self.display {
            return false;
        }
        self.display = display;
        true
    }

    /// Same mapper with a different display size.
    #[must_use]
    pub fn with_display_size(mut self, display: DisplaySize) -> Self {
        self.set_display_size(display);
        self
    }

    /// Source image size.
    #[must_use]
    pub const fn source(&self) -> Dimensions {
        self.source
    }

    /// Canvas surface size.
    #[must_use]
    pub const fn canvas(&self) -> Dimensions {
        self.canvas
    }

    /// Current display box size.
    #[must_use]
    pub const fn display(&self) -> DisplaySize {
        self.display
    }

    /// Display → canvas.
    #[must_use]
    pub fn to_canvas(&self, p: DisplayPoint) -> CanvasPoint {
        CanvasPoint::new(
            p.x * f64::from(self.canvas.width) / self.display.width,
            p.y * f64::from(self.canvas.height) / self.display.height,
        )
    }

    /// Canvas → display.
    #[must_use]
    pub fn to_display(&self, p: CanvasPoint) -> DisplayPoint {
        DisplayPoint::new(
            p.x * self.display.width / f64::from(self.canvas.width),
            p.y * self.display.height / f64::from(self.canvas.height),
        )
    }

    /// Canvas → source image, using `scale = source / canvas`.
    #[must_use]
    pub fn to_source(&self, p: CanvasPoint) -> SourcePoint {
        SourcePoint::new(
            p.x * f64::from(self.source.width) / f64::from(self.canvas.width),
            p.y * f64::from(self.source.height) / f64::from(self.canvas.height),
        )
    }

    /// Source image → canvas.
    #[must_use]
    pub fn from_source(&self, p: SourcePoint) -> CanvasPoint {
        CanvasPoint::new(
            p.x * f64::from(self.canvas.width) / f64::from(self.source.width),
            p.y * f64::from(self.canvas.height) / f64::from(self.source.height),
        )
    }

    /// Clamp a canvas point onto the canvas surface.
    #[must_use]
    pub fn clamp(&self, p: CanvasPoint) -> CanvasPoint {
        p.clamp_to(self.canvas)
    }
}
