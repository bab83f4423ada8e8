//! Paint and pixel-level data types shared by the clip and hole pipelines.
//!
//! Pixel buffers are premultiplied RGBA8 throughout, matching the raster
//! backend's output convention.

use anyhow::Context;
use kurbo::Point;

use crate::error::SilhouetteResult;

/// Straight-alpha color as supplied by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn premultiplied(self) -> [u8; 4] {
        let a = self.a as u16;
        let premul = |c: u8| ((c as u16 * a + 127) / 255) as u8;
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba8,
}

/// The paint capability set the core draws with.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Rgba8),
    /// Radial gradient clamped at the outer radius.
    Radial {
        center: Point,
        radius: f64,
        stops: Vec<GradientStop>,
    },
}

impl Paint {
    /// Transparent inside the radius with a thin edge band from 99% to 100%
    /// of it, opaque `fill` everywhere beyond.
    pub fn hole_gradient(center: Point, radius: f64, fill: Rgba8) -> Self {
        Self::Radial {
            center,
            radius,
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: Rgba8::TRANSPARENT,
                },
                GradientStop {
                    offset: 0.99,
                    color: Rgba8::TRANSPARENT,
                },
                GradientStop {
                    offset: 1.0,
                    color: fill,
                },
            ],
        }
    }
}

/// Porter-Duff modes used by the masking pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    SrcOver,
    /// Keep source where destination alpha is present.
    SrcIn,
    /// Keep destination where source alpha is present.
    DstIn,
    /// Keep destination outside the source.
    DstOut,
}

/// What gets drawn through the clip path when a raster mask is built.
#[derive(Clone, Debug, PartialEq)]
pub enum FillSource {
    Paint(Rgba8),
    Image(FillImage),
}

impl Default for FillSource {
    fn default() -> Self {
        Self::Paint(Rgba8::BLACK)
    }
}

/// A decoded fill image in premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct FillImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
}

impl FillImage {
    /// Decodes any `image`-supported format from encoded bytes.
    pub fn decode(bytes: &[u8]) -> SilhouetteResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode fill image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgba8_premul = rgba.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);

        Ok(Self {
            width,
            height,
            rgba8_premul,
        })
    }
}

/// The rasterized alpha mask: width x height premultiplied RGBA8, matching
/// the owning surface. Rebuilt from scratch whenever the surface size changes.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl MaskBitmap {
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        let idx = ((y * self.width + x) * 4 + 3) as usize;
        self.data.get(idx).copied().unwrap_or(0)
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
