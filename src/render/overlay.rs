use crate::foundation::core::{Affine, Point, Rgba8};
use crate::render::raster::Raster;
use crate::render::rasterizer;
use crate::scene::geometry::Appearance;

/// Transient decorations composited over a presented frame, never into the frame cache.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    /// Cursor position in world units, drawn as a full-width crosshair.
    pub cursor: Option<Point>,
    /// Selection markers in world units, drawn as small hollow squares.
    pub markers: Vec<Point>,
    /// Extra geometry contributed by direct-manipulation renderers.
    pub extras: Vec<Appearance>,
    pub color: Option<Rgba8>,
}

const MARKER_HALF: i64 = 2;

impl Overlay {
    pub fn is_active(&self) -> bool {
        self.cursor.is_some() || !self.markers.is_empty() || !self.extras.is_empty()
    }

    /// Draw onto `target`, which must already hold the cached frame.
    pub(crate) fn composite(&self, target: &mut Raster, transform: Affine) {
        let color = self.color.unwrap_or(Rgba8::WHITE);
        for a in self.extras.iter().filter(|a| a.is_fill_pass()) {
            rasterizer::draw_appearance(target, a, transform);
        }
        for a in self.extras.iter().filter(|a| !a.is_fill_pass()) {
            rasterizer::draw_appearance(target, a, transform);
        }

        if let Some(c) = self.cursor.map(|c| transform * c)
            && c.is_finite()
        {
            let (cx, cy) = (c.x.floor() as i64, c.y.floor() as i64);
            for x in 0..i64::from(target.width) {
                target.blend(x, cy, color, 1.0);
            }
            for y in 0..i64::from(target.height) {
                target.blend(cx, y, color, 1.0);
            }
        }

        for m in self.markers.iter().map(|&m| transform * m) {
            if !m.is_finite() {
                continue;
            }
            let (mx, my) = (m.x.floor() as i64, m.y.floor() as i64);
            for d in -MARKER_HALF..=MARKER_HALF {
                target.blend(mx + d, my - MARKER_HALF, color, 1.0);
                target.blend(mx + d, my + MARKER_HALF, color, 1.0);
                target.blend(mx - MARKER_HALF, my + d, color, 1.0);
                target.blend(mx + MARKER_HALF, my + d, color, 1.0);
            }
        }
    }
}
