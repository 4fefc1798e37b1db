use crate::foundation::error::{CanvasError, CanvasResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Fraction of the smaller viewport side covered by the unit box `[-1, 1]`.
pub const VIEWPORT_SCALE: f64 = 0.33;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> CanvasResult<Self> {
        if width == 0 || height == 0 {
            return Err(CanvasError::invalid_argument(format!(
                "viewport must be at least 1x1, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Aspect factors `(a, b)` with the shorter side normalized to 1.
    pub fn aspect(self) -> (f64, f64) {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        if self.height > self.width {
            (1.0, h / w)
        } else {
            (w / h, 1.0)
        }
    }

    /// Map world coordinates to pixels: center, uniform scale, optional aspect, then camera.
    pub fn transform(self, camera: Affine, auto_aspect: bool) -> Affine {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let s = VIEWPORT_SCALE * w.min(h);
        let aspect = if auto_aspect {
            let (a, b) = self.aspect();
            Affine::scale_non_uniform(a, b)
        } else {
            Affine::IDENTITY
        };
        Affine::translate(Vec2::new(0.5 * w, 0.5 * h)) * Affine::scale(s) * aspect * camera
    }
}

/// Straight (non-premultiplied) RGBA8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque_alpha")]
    pub a: u8,
}

fn opaque_alpha() -> u8 {
    255
}

impl Rgba8 {
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Clamp float channels in `[0, 1]` to bytes.
    pub fn from_unit_rgb(r: f32, g: f32, b: f32) -> Self {
        fn to_u8(v: f32) -> u8 {
            if v.is_nan() {
                return 0;
            }
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Self::opaque(to_u8(r), to_u8(g), to_u8(b))
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
