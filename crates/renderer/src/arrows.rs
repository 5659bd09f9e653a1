//! Arrow glyph rendering for vector fields using tiny-skia.
//!
//! Every arrow is the same unit glyph, pointing along +x from the origin to
//! `(1, 0)`, transformed by a rotation and a non-uniform scale.

use field_common::{FieldError, FieldResult};
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Transform};

use crate::colormap::Color;

/// Arrows shorter than this many pixels are visual noise and skipped.
pub const MIN_ARROW_PX: f32 = 2.0;

/// Cap on the glyph's cross-axis size in pixels.
pub const MAX_ARROW_WIDTH_PX: f32 = 12.0;

/// Configuration for arrow rendering
#[derive(Debug, Clone, Copy)]
pub struct ArrowStyle {
    pub min_length_px: f32,
    pub max_width_px: f32,
    /// Cross-axis size relative to length, before the cap
    pub width_ratio: f32,
}

impl Default for ArrowStyle {
    fn default() -> Self {
        Self {
            min_length_px: MIN_ARROW_PX,
            max_width_px: MAX_ARROW_WIDTH_PX,
            width_ratio: 0.5,
        }
    }
}

/// Outcome of drawing one arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowOutcome {
    Drawn,
    TooShort,
}

/// The pre-built unit arrow path.
#[derive(Debug, Clone)]
pub struct ArrowGlyph {
    path: Path,
    style: ArrowStyle,
}

impl ArrowGlyph {
    pub fn new(style: ArrowStyle) -> FieldResult<Self> {
        Ok(Self {
            path: unit_arrow_path()?,
            style,
        })
    }

    pub fn style(&self) -> &ArrowStyle {
        &self.style
    }

    /// Draw an arrow whose tail sits at `(x, y)` with pixel displacement `(dx, dy)`.
    pub fn draw(&self, pixmap: &mut Pixmap, x: f32, y: f32, dx: f32, dy: f32, color: Color) -> ArrowOutcome {
        let length = dx.hypot(dy);
        if !(length >= self.style.min_length_px) {
            return ArrowOutcome::TooShort;
        }

        let angle = dy.atan2(dx).to_degrees();
        let width = (length * self.style.width_ratio).min(self.style.max_width_px);

        let transform = Transform::from_translate(x, y)
            .pre_rotate(angle)
            .pre_scale(length, width);

        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;

        pixmap.fill_path(&self.path, &paint, FillRule::Winding, transform, None);
        ArrowOutcome::Drawn
    }
}

/// Shaft plus head in unit space: length 1 along x, total height 1 along y.
fn unit_arrow_path() -> FieldResult<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, -0.12);
    pb.line_to(0.65, -0.12);
    pb.line_to(0.65, -0.5);
    pb.line_to(1.0, 0.0);
    pb.line_to(0.65, 0.5);
    pb.line_to(0.65, 0.12);
    pb.line_to(0.0, 0.12);
    pb.close();
    pb.finish()
        .ok_or_else(|| FieldError::Render("failed to build arrow glyph".to_string()))
}

/// Create a transparent raster surface.
pub fn new_surface(width: u32, height: u32) -> FieldResult<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| {
        FieldError::Render(format!("invalid raster size {}x{}", width, height))
    })
}

/// Straight (non-premultiplied) RGBA bytes of a surface.
pub fn surface_to_rgba(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

/// Alpha of the pixel at `(x, y)`, 0 outside the surface.
pub fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
    pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
}
