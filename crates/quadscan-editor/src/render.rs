//! Selection overlay rendering via tiny-skia.
//!
//! [`render`] is a pure function of the cached base image, the corners,
//! and the drag flag: every call starts from a fresh copy of the base
//! pixels, so nothing from a previous frame can bleed into the next.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use tiny_skia::{
    Color, ColorU8, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke,
    Transform,
};

use crate::types::{CanvasPoint, Dimensions};

/// Rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A pixmap of the requested size could not be created.
    #[error("cannot allocate a {0} drawing surface")]
    Surface(Dimensions),
}

/// The image pixels at canvas resolution, premultiplied and ready to be
/// copied under each overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseImage {
    pixmap: Pixmap,
}

impl BaseImage {
    /// Scale `image` to the `canvas` surface and cache it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] if `canvas` has a zero axis.
    pub fn from_rgba(image: &RgbaImage, canvas: Dimensions) -> Result<Self, RenderError> {
        let mut pixmap =
            Pixmap::new(canvas.width, canvas.height).ok_or(RenderError::Surface(canvas))?;

        let scaled;
        let source = if image.dimensions() == (canvas.width, canvas.height) {
            image
        } else {
            scaled = imageops::resize(image, canvas.width, canvas.height, FilterType::Triangle);
            &scaled
        };

        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(source.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { pixmap })
    }

    /// Surface size.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixmap.width(), self.pixmap.height())
    }

    /// Cached premultiplied pixels.
    #[must_use]
    pub const fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// Colours and sizes of the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionStyle {
    /// Outline colour.
    pub stroke: Color,
    /// Outline width in canvas pixels.
    pub stroke_width: f32,
    /// Fill of a closed quadrilateral.
    pub fill: Color,
    /// Handle radius when idle; `None` draws no handles.
    pub handle_radius: Option<f32>,
    /// Handle radius while a drag is active.
    pub drag_handle_radius: f32,
    /// Handle interior.
    pub handle_fill: Color,
}

impl Default for SelectionStyle {
    fn default() -> Self {
        Self {
            stroke: Color::from_rgba8(0, 123, 255, 255),
            stroke_width: 2.0,
            fill: Color::from_rgba8(0, 123, 255, 26),
            handle_radius: Some(5.0),
            drag_handle_radius: 7.0,
            handle_fill: Color::WHITE,
        }
    }
}

/// Draw the selection over a fresh copy of `base`.
#[must_use]
pub fn render(
    base: &BaseImage,
    corners: &[CanvasPoint],
    dragging: bool,
    style: &SelectionStyle,
) -> Pixmap {
    let mut target = base.pixmap.clone();
    draw_selection(&mut target, corners, dragging, style);
    target
}

/// Like [`render`], reusing `target`'s allocation when it already has the
/// base's size.
pub fn render_into(
    target: &mut Pixmap,
    base: &BaseImage,
    corners: &[CanvasPoint],
    dragging: bool,
    style: &SelectionStyle,
) {
    if target.width() == base.pixmap.width() && target.height() == base.pixmap.height() {
        target.data_mut().copy_from_slice(base.pixmap.data());
    } else {
        *target = base.pixmap.clone();
    }
    draw_selection(target, corners, dragging, style);
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(p: CanvasPoint) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

fn outline(corners: &[CanvasPoint]) -> Option<Path> {
    let (first, rest) = corners.split_first()?;
    let mut pb = PathBuilder::new();
    let (x, y) = to_f32(*first);
    pb.move_to(x, y);
    for &p in rest {
        let (x, y) = to_f32(p);
        pb.line_to(x, y);
    }
    if corners.len() == crate::corners::MAX_CORNERS {
        pb.close();
    }
    pb.finish()
}

fn draw_selection(
    target: &mut Pixmap,
    corners: &[CanvasPoint],
    dragging: bool,
    style: &SelectionStyle,
) {
    let mut paint = Paint {
        anti_alias: true,
        ..Paint::default()
    };

    if corners.len() >= 2
        && let Some(path) = outline(corners)
    {
        if corners.len() == crate::corners::MAX_CORNERS {
            paint.set_color(style.fill);
            target.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
        let stroke = Stroke {
            width: style.stroke_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        paint.set_color(style.stroke);
        target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    let Some(idle_radius) = style.handle_radius else {
        return;
    };
    let radius = if dragging {
        style.drag_handle_radius
    } else {
        idle_radius
    };
    let ring = Stroke {
        width: style.stroke_width,
        ..Stroke::default()
    };
    for &corner in corners {
        let (x, y) = to_f32(corner);
        let Some(circle) = PathBuilder::from_circle(x, y, radius) else {
            continue;
        };
        paint.set_color(style.handle_fill);
        target.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
        paint.set_color(style.stroke);
        target.stroke_path(&circle, &paint, &ring, Transform::identity(), None);
    }
}

/// Convert a premultiplied pixmap to straight-alpha RGBA.
#[must_use]
pub fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    img
}
