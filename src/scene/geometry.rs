use std::sync::Arc;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{CanvasError, CanvasResult};

/// Primitive family of a [`GeometryArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// One point per vertex.
    Point,
    /// Independent segments, two vertices each.
    Line,
    /// Connected segments, split into strips by `strip_counts`.
    LineStrip,
    /// Independent filled triangles.
    Triangle,
    /// Independent filled quads.
    Quad,
    /// Triangle strips split by `strip_counts`.
    TriangleStrip,
    /// Triangle strips over an index buffer.
    IndexedTriangleStrip,
}

impl GeometryKind {
    /// Filled primitives go in the first pass, strokes and points in the second.
    pub fn is_filled(self) -> bool {
        matches!(
            self,
            Self::Triangle | Self::Quad | Self::TriangleStrip | Self::IndexedTriangleStrip
        )
    }

    fn has_strips(self) -> bool {
        matches!(
            self,
            Self::LineStrip | Self::TriangleStrip | Self::IndexedTriangleStrip
        )
    }
}

/// Validated vertex buffer for one primitive family.
///
/// Coordinates are 3 floats per vertex. Colors, when present, are 3 or 4 unsigned bytes per
/// vertex. Construction goes through [`GeometryBuilder`], which rejects inconsistent buffers
/// with [`CanvasError::InvariantViolation`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "GeometryRepr", into = "GeometryRepr")]
pub struct GeometryArray {
    kind: GeometryKind,
    vertex_count: usize,
    coordinates: Vec<f32>,
    colors: Option<Vec<u8>>,
    strip_counts: Vec<usize>,
    indices: Vec<u32>,
}

impl GeometryArray {
    /// Start building an array of `kind` over flat xyz coordinates.
    pub fn builder(kind: GeometryKind, coordinates: Vec<f32>) -> GeometryBuilder {
        GeometryBuilder {
            kind,
            coordinates,
            vertex_count: None,
            colors: None,
            strip_counts: None,
            indices: Vec::new(),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn coordinates(&self) -> &[f32] {
        &self.coordinates
    }

    pub fn colors(&self) -> Option<&[u8]> {
        self.colors.as_deref()
    }

    /// Bytes per vertex in the color buffer (0 without colors).
    pub fn color_channels(&self) -> usize {
        match &self.colors {
            Some(c) if self.vertex_count > 0 => c.len() / self.vertex_count,
            Some(_) => 3,
            None => 0,
        }
    }

    pub fn strip_counts(&self) -> &[usize] {
        &self.strip_counts
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// xyz of vertex `i`.
    pub fn vertex(&self, i: usize) -> [f32; 3] {
        let o = 3 * i;
        [
            self.coordinates[o],
            self.coordinates[o + 1],
            self.coordinates[o + 2],
        ]
    }

    /// Color of vertex `i` as RGBA; 3-channel buffers read as opaque.
    pub fn vertex_color(&self, i: usize) -> Option<Rgba8> {
        let colors = self.colors.as_ref()?;
        let ch = self.color_channels();
        let o = ch * i;
        let a = if ch == 4 { colors[o + 3] } else { 255 };
        Some(Rgba8 {
            r: colors[o],
            g: colors[o + 1],
            b: colors[o + 2],
            a,
        })
    }
}

/// Builder for [`GeometryArray`].
#[derive(Clone, Debug)]
pub struct GeometryBuilder {
    kind: GeometryKind,
    coordinates: Vec<f32>,
    vertex_count: Option<usize>,
    colors: Option<Vec<u8>>,
    strip_counts: Option<Vec<usize>>,
    indices: Vec<u32>,
}

impl GeometryBuilder {
    /// Declare the vertex count explicitly. Defaults to `coordinates.len() / 3`.
    pub fn vertex_count(mut self, n: usize) -> Self {
        self.vertex_count = Some(n);
        self
    }

    /// Per-vertex colors, 3 or 4 bytes per vertex.
    pub fn colors(mut self, colors: Vec<u8>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Per-vertex colors given as signed bytes; negative values wrap to `v + 256`.
    pub fn signed_colors(self, colors: Vec<i8>) -> Self {
        self.colors(colors.into_iter().map(|v| v as u8).collect())
    }

    /// Vertex counts of consecutive strips. Defaults to a single strip over every vertex
    /// (or every index for indexed strips).
    pub fn strip_counts(mut self, counts: Vec<usize>) -> Self {
        self.strip_counts = Some(counts);
        self
    }

    pub fn indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    pub fn build(self) -> CanvasResult<GeometryArray> {
        let Self {
            kind,
            coordinates,
            vertex_count,
            colors,
            strip_counts,
            indices,
        } = self;
        let vc = vertex_count.unwrap_or(coordinates.len() / 3);

        if coordinates.len() != vc.saturating_mul(3) {
            return Err(CanvasError::invariant(format!(
                "{kind:?}: {} coordinates for {vc} vertices",
                coordinates.len()
            )));
        }
        if let Some(c) = &colors
            && c.len() != 3 * vc
            && c.len() != 4 * vc
        {
            return Err(CanvasError::invariant(format!(
                "{kind:?}: {} color bytes for {vc} vertices",
                c.len()
            )));
        }

        let per_primitive = match kind {
            GeometryKind::Line => 2,
            GeometryKind::Triangle => 3,
            GeometryKind::Quad => 4,
            _ => 1,
        };
        if vc % per_primitive != 0 {
            return Err(CanvasError::invariant(format!(
                "{kind:?}: vertex count {vc} is not a multiple of {per_primitive}"
            )));
        }

        if kind != GeometryKind::IndexedTriangleStrip && !indices.is_empty() {
            return Err(CanvasError::invariant(format!(
                "{kind:?}: index buffer only valid on indexed strips"
            )));
        }
        if let Some(i) = indices.iter().find(|&&i| i as usize >= vc) {
            return Err(CanvasError::invariant(format!(
                "{kind:?}: index {i} out of range for {vc} vertices"
            )));
        }

        let strip_counts = if kind.has_strips() {
            let total = if kind == GeometryKind::IndexedTriangleStrip {
                indices.len()
            } else {
                vc
            };
            let counts = strip_counts.unwrap_or_else(|| if total > 0 { vec![total] } else { vec![] });
            let sum = counts.iter().try_fold(0usize, |acc, &n| acc.checked_add(n));
            if sum != Some(total) {
                return Err(CanvasError::invariant(format!(
                    "{kind:?}: strip counts {counts:?} do not sum to {total}"
                )));
            }
            counts
        } else {
            if strip_counts.is_some_and(|c| !c.is_empty()) {
                return Err(CanvasError::invariant(format!(
                    "{kind:?}: strip counts only valid on strip variants"
                )));
            }
            Vec::new()
        };

        Ok(GeometryArray {
            kind,
            vertex_count: vc,
            coordinates,
            colors,
            strip_counts,
            indices,
        })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct GeometryRepr {
    kind: GeometryKind,
    coordinates: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vertex_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    colors: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strip_counts: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    indices: Vec<u32>,
}

impl TryFrom<GeometryRepr> for GeometryArray {
    type Error = CanvasError;

    fn try_from(r: GeometryRepr) -> Result<Self, Self::Error> {
        let mut b = GeometryArray::builder(r.kind, r.coordinates).indices(r.indices);
        if let Some(n) = r.vertex_count {
            b = b.vertex_count(n);
        }
        if let Some(c) = r.colors {
            b = b.colors(c);
        }
        if let Some(s) = r.strip_counts {
            b = b.strip_counts(s);
        }
        b.build()
    }
}

impl From<GeometryArray> for GeometryRepr {
    fn from(g: GeometryArray) -> Self {
        let strip_counts = g.kind.has_strips().then_some(g.strip_counts);
        Self {
            kind: g.kind,
            vertex_count: Some(g.vertex_count),
            coordinates: g.coordinates,
            colors: g.colors,
            strip_counts,
            indices: g.indices,
        }
    }
}

/// Stroke pattern of lines and line strips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

impl LineStyle {
    /// On/off run lengths for a unit-width stroke; empty means solid.
    pub fn dash_pattern(self) -> &'static [f64] {
        match self {
            Self::Solid => &[],
            Self::Dash => &[8.0],
            Self::Dot => &[1.0, 7.0],
            Self::DashDot => &[7.0, 4.0, 1.0, 4.0],
        }
    }
}

/// Source image of an image-backed quad.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "SourceImageRepr", into = "SourceImageRepr")]
pub struct SourceImage(Arc<image::RgbaImage>);

impl SourceImage {
    pub fn new(image: image::RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    /// Wrap tightly packed RGBA8 rows.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> CanvasResult<Self> {
        let len = data.len();
        image::RgbaImage::from_raw(width, height, data)
            .map(Self::new)
            .ok_or_else(|| {
                CanvasError::invariant(format!(
                    "source image {width}x{height} needs {} bytes, got {len}",
                    (width as usize) * (height as usize) * 4
                ))
            })
    }

    pub fn image(&self) -> &image::RgbaImage {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SourceImageRepr {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl TryFrom<SourceImageRepr> for SourceImage {
    type Error = CanvasError;

    fn try_from(r: SourceImageRepr) -> Result<Self, Self::Error> {
        Self::from_rgba(r.width, r.height, r.rgba)
    }
}

impl From<SourceImage> for SourceImageRepr {
    fn from(s: SourceImage) -> Self {
        Self {
            width: s.width(),
            height: s.height(),
            rgba: s.0.as_raw().clone(),
        }
    }
}

/// Leaf node: material attributes plus the geometry they apply to.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "AppearanceRepr", into = "AppearanceRepr")]
pub struct Appearance {
    point_size: f32,
    line_width: f32,
    line_style: LineStyle,
    color: Option<Rgba8>,
    transparency: f32,
    geometry: GeometryArray,
    image: Option<SourceImage>,
}

impl Appearance {
    /// Unit point size and line width, solid, opaque, no flat color.
    pub fn new(geometry: GeometryArray) -> Self {
        Self {
            point_size: 1.0,
            line_width: 1.0,
            line_style: LineStyle::Solid,
            color: None,
            transparency: 0.0,
            geometry,
            image: None,
        }
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.line_style = style;
        self
    }

    /// Flat color used when the geometry has no per-vertex colors. Alpha is ignored.
    pub fn with_color(mut self, color: Rgba8) -> Self {
        self.color = Some(color.with_alpha(255));
        self
    }

    /// Transparency in `[0, 1]`; out-of-range values are clamped and NaN reads as opaque.
    pub fn with_transparency(mut self, t: f32) -> Self {
        self.transparency = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self
    }

    /// Attach a source image. Only a 4-vertex quad can carry one.
    pub fn with_image(mut self, image: SourceImage) -> CanvasResult<Self> {
        if self.geometry.kind() != GeometryKind::Quad || self.geometry.vertex_count() != 4 {
            return Err(CanvasError::invariant(format!(
                "source image requires a 4-vertex quad, got {:?} with {} vertices",
                self.geometry.kind(),
                self.geometry.vertex_count()
            )));
        }
        self.image = Some(image);
        Ok(self)
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn line_style(&self) -> LineStyle {
        self.line_style
    }

    pub fn color(&self) -> Option<Rgba8> {
        self.color
    }

    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    pub fn geometry(&self) -> &GeometryArray {
        &self.geometry
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    /// Color used when the geometry carries none: the flat color, else white.
    pub fn fallback_color(&self) -> Rgba8 {
        self.color.unwrap_or(Rgba8::WHITE)
    }

    /// Drawn in the first (fill) pass.
    pub fn is_fill_pass(&self) -> bool {
        self.image.is_some() || self.geometry.kind().is_filled()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct AppearanceRepr {
    #[serde(default = "unit")]
    point_size: f32,
    #[serde(default = "unit")]
    line_width: f32,
    #[serde(default)]
    line_style: LineStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<Rgba8>,
    #[serde(default)]
    transparency: f32,
    geometry: GeometryArray,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<SourceImage>,
}

fn unit() -> f32 {
    1.0
}

impl TryFrom<AppearanceRepr> for Appearance {
    type Error = CanvasError;

    fn try_from(r: AppearanceRepr) -> Result<Self, Self::Error> {
        let mut a = Appearance::new(r.geometry)
            .with_point_size(r.point_size)
            .with_line_width(r.line_width)
            .with_line_style(r.line_style)
            .with_transparency(r.transparency);
        if let Some(c) = r.color {
            a = a.with_color(c);
        }
        if let Some(img) = r.image {
            a = a.with_image(img)?;
        }
        Ok(a)
    }
}

impl From<Appearance> for AppearanceRepr {
    fn from(a: Appearance) -> Self {
        Self {
            point_size: a.point_size,
            line_width: a.line_width,
            line_style: a.line_style,
            color: a.color,
            transparency: a.transparency,
            geometry: a.geometry,
            image: a.image,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/geometry.rs"]
mod tests;
