use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{Rgba8, Viewport};
use crate::foundation::error::{CanvasError, CanvasResult};

/// Opaque RGBA8 image, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl Raster {
    /// Allocate a raster of the viewport's size filled with `color`.
    pub fn new(viewport: Viewport, color: Rgba8) -> Self {
        let px = color.with_alpha(255).to_array();
        let data = px
            .iter()
            .copied()
            .cycle()
            .take(viewport.pixel_count() * 4)
            .collect();
        Self {
            width: viewport.width,
            height: viewport.height,
            data,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }

    pub fn clear(&mut self, color: Rgba8) {
        let px = color.with_alpha(255).to_array();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = ((y as usize) * (self.width as usize) + x as usize) * 4;
        Some(Rgba8 {
            r: self.data[o],
            g: self.data[o + 1],
            b: self.data[o + 2],
            a: self.data[o + 3],
        })
    }

    /// Blend `color` over the pixel at `(x, y)` with coverage `alpha` in `[0, 1]`.
    ///
    /// Out-of-bounds coordinates are ignored. The result stays opaque.
    pub(crate) fn blend(&mut self, x: i64, y: i64, color: Rgba8, alpha: f32) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let o = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = &mut self.data[o..o + 4];
        if alpha >= 1.0 {
            px.copy_from_slice(&[color.r, color.g, color.b, 255]);
            return;
        }
        if alpha <= 0.0 {
            return;
        }
        let mix = |s: u8, d: u8| -> u8 {
            (f32::from(s) * alpha + f32::from(d) * (1.0 - alpha)).round() as u8
        };
        px[0] = mix(color.r, px[0]);
        px[1] = mix(color.g, px[1]);
        px[2] = mix(color.b, px[2]);
        px[3] = 255;
    }

    pub fn to_image(&self) -> CanvasResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CanvasError::invariant(format!(
                "raster {}x{} holds {} bytes",
                self.width,
                self.height,
                self.data.len()
            ))
        })
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> CanvasResult<()> {
        let path = path.as_ref();
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
