//! Software rasterizer for the scene graph's primitive families.
//!
//! Coverage is binary: a pixel is painted when its centre falls inside the primitive. Colors are
//! straight RGBA8 blended over an opaque destination.

use crate::foundation::config::ChildOrder;
use crate::foundation::core::{Affine, Point, Rect, Rgba8, Vec2};
use crate::foundation::error::CanvasResult;
use crate::render::raster::Raster;
use crate::scene::geometry::{Appearance, GeometryArray, GeometryKind, SourceImage};
use crate::scene::graph::{Node, NodeId, SceneGraph};

/// Per-redraw inputs of [`draw_scene`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct DrawParams {
    /// World to pixel transform.
    pub(crate) transform: Affine,
    /// Clip rectangle in world units, honoured beneath the content roots only.
    pub(crate) clip: Option<Rect>,
    pub(crate) child_order: ChildOrder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Fill,
    Stroke,
}

/// Half-open pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PixelBounds {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl PixelBounds {
    pub(crate) fn of(raster: &Raster) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: i64::from(raster.width),
            y1: i64::from(raster.height),
        }
    }

    /// Pixels whose centres lie inside `r`, intersected with `self`.
    fn clip_to(self, r: Rect) -> Self {
        let r = r.abs();
        Self {
            x0: self.x0.max(center_floor(r.x0)),
            y0: self.y0.max(center_floor(r.y0)),
            x1: self.x1.min(center_floor(r.x1)),
            y1: self.y1.min(center_floor(r.y1)),
        }
    }

    fn to_rect(self) -> Rect {
        Rect::new(self.x0 as f64, self.y0 as f64, self.x1 as f64, self.y1 as f64)
    }

    fn is_empty(self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    fn contains(self, x: i64, y: i64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// First pixel index whose centre is at or right of `v`.
fn center_floor(v: f64) -> i64 {
    (v - 0.5).ceil().clamp(i64::MIN as f64, i64::MAX as f64) as i64
}

/// Draw the active scene into `raster` in two passes (fills and images, then strokes and points).
///
/// Switches follow their selected child only. The caller clears the raster beforehand.
pub(crate) fn draw_scene(
    graph: &SceneGraph,
    raster: &mut Raster,
    params: &DrawParams,
) -> CanvasResult<()> {
    let full = PixelBounds::of(raster);
    let clip = params
        .clip
        .map(|r| full.clip_to(params.transform.transform_rect_bbox(r)));
    let mut walk = Walk {
        graph,
        painter: Painter {
            raster,
            transform: params.transform,
            bounds: full,
        },
        full,
        clip,
        order: params.child_order,
    };
    for pass in [Pass::Fill, Pass::Stroke] {
        walk.visit(graph.root(), pass, false)?;
    }
    Ok(())
}

/// Draw a single appearance outside any scene traversal (overlays).
pub(crate) fn draw_appearance(raster: &mut Raster, appearance: &Appearance, transform: Affine) {
    let bounds = PixelBounds::of(raster);
    let mut p = Painter {
        raster,
        transform,
        bounds,
    };
    p.appearance(appearance);
}

struct Walk<'g, 'r> {
    graph: &'g SceneGraph,
    painter: Painter<'r>,
    full: PixelBounds,
    clip: Option<PixelBounds>,
    order: ChildOrder,
}

impl Walk<'_, '_> {
    fn visit(&mut self, id: NodeId, pass: Pass, clipped: bool) -> CanvasResult<()> {
        let clipped =
            clipped || id == self.graph.direct_root() || id == self.graph.non_direct_root();
        match self.graph.node(id)? {
            Node::Group(g) => match self.order {
                ChildOrder::Reverse => {
                    for &c in g.children().iter().rev() {
                        self.visit(c, pass, clipped)?;
                    }
                }
                ChildOrder::Forward => {
                    for &c in g.children() {
                        self.visit(c, pass, clipped)?;
                    }
                }
            },
            Node::Switch(s) => {
                if let Some(c) = s.selected_child() {
                    self.visit(c, pass, clipped)?;
                }
            }
            Node::Appearance(a) => {
                let wanted = if a.is_fill_pass() {
                    Pass::Fill
                } else {
                    Pass::Stroke
                };
                if wanted == pass {
                    self.painter.bounds = match (clipped, self.clip) {
                        (true, Some(c)) => c,
                        _ => self.full,
                    };
                    if !self.painter.bounds.is_empty() {
                        self.painter.appearance(a);
                    }
                }
            }
        }
        Ok(())
    }
}

struct Painter<'r> {
    raster: &'r mut Raster,
    transform: Affine,
    bounds: PixelBounds,
}

impl Painter<'_> {
    fn appearance(&mut self, a: &Appearance) {
        let g = a.geometry();
        let base_alpha = 1.0 - a.transparency();
        let pts: Vec<Point> = (0..g.vertex_count())
            .map(|i| {
                let [x, y, _] = g.vertex(i);
                self.transform * Point::new(f64::from(x), f64::from(y))
            })
            .collect();

        if let Some(img) = a.image() {
            self.image_quad(&pts, img, base_alpha);
            return;
        }

        let shade = |verts: &[usize]| -> (Rgba8, f32) {
            match mean_color(g, verts) {
                Some(c) => (c.with_alpha(255), base_alpha * f32::from(c.a) / 255.0),
                None => (a.fallback_color(), base_alpha),
            }
        };

        match g.kind() {
            GeometryKind::Point => {
                for (i, &p) in pts.iter().enumerate() {
                    let (c, alpha) = shade(&[i]);
                    self.point(p, a.point_size(), c, alpha);
                }
            }
            GeometryKind::Line => {
                for i in (0..pts.len()).step_by(2) {
                    let (c, alpha) = shade(&[i, i + 1]);
                    self.segment(pts[i], pts[i + 1], a, c, alpha);
                }
            }
            GeometryKind::LineStrip => {
                let mut start = 0;
                for &n in g.strip_counts() {
                    for k in start..(start + n).saturating_sub(1) {
                        let (c, alpha) = shade(&[k, k + 1]);
                        self.segment(pts[k], pts[k + 1], a, c, alpha);
                    }
                    start += n;
                }
            }
            GeometryKind::Triangle | GeometryKind::Quad => {
                let n = if g.kind() == GeometryKind::Triangle { 3 } else { 4 };
                for face in (0..pts.len()).step_by(n) {
                    let verts: Vec<usize> = (face..face + n).collect();
                    let (c, alpha) = shade(&verts);
                    self.face(&pts, &verts, c, alpha);
                }
            }
            GeometryKind::TriangleStrip => {
                let mut start = 0;
                for &n in g.strip_counts() {
                    for k in start..(start + n).saturating_sub(2) {
                        let verts = [k, k + 1, k + 2];
                        let (c, alpha) = shade(&verts);
                        self.face(&pts, &verts, c, alpha);
                    }
                    start += n;
                }
            }
            GeometryKind::IndexedTriangleStrip => {
                let idx = g.indices();
                let mut start = 0;
                for &n in g.strip_counts() {
                    for k in start..(start + n).saturating_sub(2) {
                        let verts = [idx[k] as usize, idx[k + 1] as usize, idx[k + 2] as usize];
                        let (c, alpha) = shade(&verts);
                        self.face(&pts, &verts, c, alpha);
                    }
                    start += n;
                }
            }
        }
    }

    fn point(&mut self, p: Point, size: f32, color: Rgba8, alpha: f32) {
        if !p.is_finite() {
            return;
        }
        if (size - 1.0).abs() < 0.1 {
            self.plot(p.x.floor() as i64, p.y.floor() as i64, color, alpha);
            return;
        }
        let h = 0.5 * f64::from(size);
        let square = [
            Point::new(p.x - h, p.y - h),
            Point::new(p.x + h, p.y - h),
            Point::new(p.x + h, p.y + h),
            Point::new(p.x - h, p.y + h),
        ];
        self.fill_polygon(&square, color, alpha);
    }

    fn segment(&mut self, p0: Point, p1: Point, a: &Appearance, color: Rgba8, alpha: f32) {
        if !p0.is_finite() || !p1.is_finite() {
            return;
        }
        let width = f64::from(a.line_width());
        let pattern = a.line_style().dash_pattern();
        let d = p1 - p0;
        let len = d.hypot();
        let margin = width.max(1.0) + 1.0;
        let Some((t0, t1)) = clip_segment(p0, p1, self.bounds.to_rect().inflate(margin, margin))
        else {
            return;
        };

        if width <= 1.0 {
            self.thin_segment(p0 + d * t0, p0 + d * t1, t0 * len, pattern, color, alpha);
            return;
        }

        let u = if len > 0.0 { d / len } else { Vec2::new(1.0, 0.0) };
        let n = Vec2::new(-u.y, u.x) * (0.5 * width);
        let cap = 0.5 * width;
        // Runs are relative to the clipped start so far-off endpoints keep precision.
        let origin = p0 + d * t0;
        for (s, e) in dash_runs(pattern, width, len, (t0 * len, t1 * len)) {
            let a0 = origin + u * (s - cap);
            let a1 = origin + u * (e + cap);
            let quad = [a0 + n, a1 + n, a1 - n, a0 - n];
            self.fill_polygon(&quad, color, alpha);
        }
    }

    /// One-pixel Bresenham line; dashes are measured in pixels along the line, starting at
    /// arc length `offset`.
    fn thin_segment(
        &mut self,
        p0: Point,
        p1: Point,
        offset: f64,
        pattern: &[f64],
        color: Rgba8,
        alpha: f32,
    ) {
        let (mut x, mut y) = (p0.x.floor() as i64, p0.y.floor() as i64);
        let (x1, y1) = (p1.x.floor() as i64, p1.y.floor() as i64);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let steps = dx.max(-dy);
        let step_len = if steps > 0 {
            (p1 - p0).hypot() / steps as f64
        } else {
            0.0
        };
        let mut err = dx + dy;
        let mut k = 0i64;
        loop {
            if dash_on(pattern, 1.0, offset + k as f64 * step_len) {
                self.plot(x, y, color, alpha);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            k += 1;
        }
    }

    fn face(&mut self, pts: &[Point], verts: &[usize], color: Rgba8, alpha: f32) {
        let poly: Vec<Point> = verts.iter().map(|&i| pts[i]).collect();
        self.fill_polygon(&poly, color, alpha);
    }

    /// Even-odd scanline fill sampling pixel centres.
    fn fill_polygon(&mut self, poly: &[Point], color: Rgba8, alpha: f32) {
        if poly.len() < 3 || poly.iter().any(|p| !p.is_finite()) {
            return;
        }
        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in poly {
            ymin = ymin.min(p.y);
            ymax = ymax.max(p.y);
        }
        let b = self.bounds;
        let row0 = b.y0.max(center_floor(ymin));
        let row1 = b.y1.min(center_floor(ymax) + 1);
        let mut xs: Vec<f64> = Vec::with_capacity(poly.len());
        for row in row0..row1 {
            let yc = row as f64 + 0.5;
            xs.clear();
            for (i, &p) in poly.iter().enumerate() {
                let q = poly[(i + 1) % poly.len()];
                if (p.y <= yc) != (q.y <= yc) {
                    xs.push(p.x + (yc - p.y) * (q.x - p.x) / (q.y - p.y));
                }
            }
            xs.sort_by(f64::total_cmp);
            for span in xs.chunks_exact(2) {
                let c0 = b.x0.max(center_floor(span[0]));
                let c1 = b.x1.min(center_floor(span[1]));
                for col in c0..c1 {
                    self.raster.blend(col, row, color, alpha);
                }
            }
        }
    }

    /// Draw `img` through the affine map taking its corners onto the quad's first,
    /// second and fourth vertices. Nearest-neighbour sampling at pixel centres.
    fn image_quad(&mut self, pts: &[Point], img: &SourceImage, base_alpha: f32) {
        let (w, h) = (f64::from(img.width()), f64::from(img.height()));
        if pts.len() != 4 || w <= 0.0 || h <= 0.0 || pts.iter().any(|p| !p.is_finite()) {
            return;
        }
        let (c0, c1, c3) = (pts[0], pts[1], pts[3]);
        let m00 = (c1.x - c0.x) / w;
        let m10 = (c1.y - c0.y) / w;
        let m01 = (c3.x - c0.x) / h;
        let m11 = (c3.y - c0.y) / h;
        let det = m00 * m11 - m01 * m10;
        if !det.is_finite() || det.abs() < 1e-12 {
            return;
        }

        let c2 = c1 + (c3 - c0);
        let corners = [c0, c1, c2, c3];
        let mut bbox = Rect::from_points(c0, c1);
        for &c in &corners[2..] {
            bbox = bbox.union_pt(c);
        }
        let b = self.bounds.clip_to(bbox);
        if b.is_empty() {
            return;
        }
        let src = img.image();
        for row in b.y0..b.y1 {
            for col in b.x0..b.x1 {
                let dx = col as f64 + 0.5 - c0.x;
                let dy = row as f64 + 0.5 - c0.y;
                let u = (m11 * dx - m01 * dy) / det;
                let v = (m00 * dy - m10 * dx) / det;
                if !(0.0..w).contains(&u) || !(0.0..h).contains(&v) {
                    continue;
                }
                let px = src.get_pixel(u as u32, v as u32).0;
                let alpha = base_alpha * f32::from(px[3]) / 255.0;
                self.raster
                    .blend(col, row, Rgba8::opaque(px[0], px[1], px[2]), alpha);
            }
        }
    }

    fn plot(&mut self, x: i64, y: i64, color: Rgba8, alpha: f32) {
        if self.bounds.contains(x, y) {
            self.raster.blend(x, y, color, alpha);
        }
    }
}

/// Integer mean of the vertex colors, or `None` when the geometry has no colors.
fn mean_color(g: &GeometryArray, verts: &[usize]) -> Option<Rgba8> {
    if g.colors().is_none() || verts.is_empty() {
        return None;
    }
    let mut sum = [0u32; 4];
    for &v in verts {
        let c = g.vertex_color(v)?;
        sum[0] += u32::from(c.r);
        sum[1] += u32::from(c.g);
        sum[2] += u32::from(c.b);
        sum[3] += u32::from(c.a);
    }
    let n = verts.len() as u32;
    Some(Rgba8 {
        r: (sum[0] / n) as u8,
        g: (sum[1] / n) as u8,
        b: (sum[2] / n) as u8,
        a: (sum[3] / n) as u8,
    })
}

/// On/off state at arc length `dist` for `pattern` scaled by `scale`.
fn dash_on(pattern: &[f64], scale: f64, dist: f64) -> bool {
    if pattern.is_empty() {
        return true;
    }
    let scale = scale.max(1.0);
    let reps = if pattern.len() % 2 == 1 { 2.0 } else { 1.0 };
    let period = pattern.iter().sum::<f64>() * scale * reps;
    let mut d = dist.rem_euclid(period);
    let mut on = true;
    for &run in pattern.iter().cycle() {
        let len = run * scale;
        if d < len {
            return on;
        }
        d -= len;
        on = !on;
    }
    on
}

/// Painted `[start, end)` runs of a segment of `length` that overlap `window`, measured from
/// `window.0`.
fn dash_runs(pattern: &[f64], scale: f64, length: f64, window: (f64, f64)) -> Vec<(f64, f64)> {
    if length <= 0.0 {
        return vec![(0.0, 0.0)];
    }
    let start = window.0.max(0.0);
    let span = (window.1.min(length) - start).max(0.0);
    let scale = scale.max(1.0);
    let reps = if pattern.len() % 2 == 1 { 2 } else { 1 };
    let period = pattern.iter().sum::<f64>() * scale * reps as f64;
    if pattern.is_empty() || !period.is_finite() || period <= 0.0 {
        return vec![(0.0, span)];
    }
    let periods = (span / period).ceil() as usize + 1;
    let mut pos = -start.rem_euclid(period);
    let mut runs = Vec::new();
    let mut on = true;
    for &run in pattern.iter().cycle().take(periods * pattern.len() * reps) {
        if pos >= span {
            break;
        }
        let end = (pos + run * scale).min(span);
        if on && end > 0.0 {
            runs.push((pos.max(0.0), end));
        }
        pos += run * scale;
        on = !on;
    }
    runs
}

/// Parametric range of `p0 -> p1` inside `r` (Liang-Barsky), or `None` when it misses.
fn clip_segment(p0: Point, p1: Point, r: Rect) -> Option<(f64, f64)> {
    let d = p1 - p0;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-d.x, p0.x - r.x0),
        (d.x, r.x1 - p0.x),
        (-d.y, p0.y - r.y0),
        (d.y, r.y1 - p0.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    Some((t0, t1))
}

#[cfg(test)]
#[path = "../../tests/unit/render/rasterizer.rs"]
mod tests;
