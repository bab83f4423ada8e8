//! CPU rasterization of clip paths and the surface the core draws against.
//!
//! Vector paths are rasterized through `vello_cpu`; everything after coverage
//! (masking blends, gradient evaluation) happens on premultiplied RGBA8
//! buffers in [`crate::composite`].

use kurbo::{BezPath, PathEl, Rect};

use crate::{
    composite,
    error::{SilhouetteError, SilhouetteResult},
    paint::{BlendMode, FillImage, FillSource, MaskBitmap, Paint, Rgba8},
};

/// The immediate-mode drawing capability set the core produces calls against.
pub trait DrawSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fill_path(&mut self, path: &BezPath, paint: &Paint, blend: BlendMode)
    -> SilhouetteResult<()>;
    fn fill_rect(&mut self, rect: Rect, paint: &Paint, blend: BlendMode) -> SilhouetteResult<()>;
    fn draw_bitmap(&mut self, bitmap: &MaskBitmap, blend: BlendMode) -> SilhouetteResult<()>;
}

/// Rasterizes a path as a solid fill (nonzero winding) into a fresh
/// transparent buffer, returning premultiplied RGBA8.
pub fn rasterize_path(
    path: &BezPath,
    color: Rgba8,
    width: u32,
    height: u32,
) -> SilhouetteResult<Vec<u8>> {
    let (w16, h16) = dims_u16(width, height)?;

    let mut ctx = vello_cpu::RenderContext::new(w16, h16);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    ctx.fill_path(&bezpath_to_cpu(path));
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    ctx.render_to_pixmap(&mut pixmap);
    Ok(pixmap.data_as_u8_slice().to_vec())
}

/// Builds the offscreen alpha mask: the fill source drawn through the clip
/// path (solid paint) or stretched over the full surface (image).
pub fn build_mask(
    path: &BezPath,
    fill: &FillSource,
    width: u32,
    height: u32,
) -> SilhouetteResult<MaskBitmap> {
    let data = match fill {
        FillSource::Paint(color) => rasterize_path(path, *color, width, height)?,
        FillSource::Image(image) => resample_nearest(image, width, height)?,
    };
    tracing::debug!(width, height, "rebuilt clip mask bitmap");
    Ok(MaskBitmap {
        width,
        height,
        data,
    })
}

/// A plain premultiplied RGBA8 surface backing the draw boundary.
#[derive(Clone, Debug)]
pub struct CpuSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CpuSurface {
    pub fn new(width: u32, height: u32) -> SilhouetteResult<Self> {
        dims_u16(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        })
    }

    pub fn clear(&mut self, color: Rgba8) {
        let px = color.premultiplied();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn blend_source_pixels<F>(&mut self, blend: BlendMode, mut src_at: F)
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let width = self.width;
        for (i, d) in self.data.chunks_exact_mut(4).enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            let out = composite::blend([d[0], d[1], d[2], d[3]], src_at(x, y), blend);
            d.copy_from_slice(&out);
        }
    }
}

impl DrawSurface for CpuSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_path(
        &mut self,
        path: &BezPath,
        paint: &Paint,
        blend: BlendMode,
    ) -> SilhouetteResult<()> {
        match paint {
            Paint::Solid(color) => {
                let src = rasterize_path(path, *color, self.width, self.height)?;
                composite::blend_in_place(&mut self.data, &src, blend)
            }
            Paint::Radial {
                center,
                radius,
                stops,
            } => {
                // Coverage first, then modulate the gradient by it.
                let coverage =
                    rasterize_path(path, Rgba8::new(255, 255, 255, 255), self.width, self.height)?;
                let (center, radius, stops) = (*center, *radius, stops.clone());
                let width = self.width;
                self.blend_source_pixels(blend, |x, y| {
                    let cov = coverage[((y * width + x) * 4 + 3) as usize];
                    if cov == 0 {
                        return [0, 0, 0, 0];
                    }
                    let g = composite::eval_radial(
                        center,
                        radius,
                        &stops,
                        f64::from(x) + 0.5,
                        f64::from(y) + 0.5,
                    );
                    composite::dst_in(g, [0, 0, 0, cov])
                });
                Ok(())
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint, blend: BlendMode) -> SilhouetteResult<()> {
        let x0 = rect.x0.max(0.0) as u32;
        let y0 = rect.y0.max(0.0) as u32;
        let x1 = (rect.x1.min(f64::from(self.width))).max(0.0) as u32;
        let y1 = (rect.y1.min(f64::from(self.height))).max(0.0) as u32;
        let paint = paint.clone();
        self.blend_source_pixels(blend, |x, y| {
            if x < x0 || x >= x1 || y < y0 || y >= y1 {
                return [0, 0, 0, 0];
            }
            source_pixel(&paint, x, y)
        });
        Ok(())
    }

    fn draw_bitmap(&mut self, bitmap: &MaskBitmap, blend: BlendMode) -> SilhouetteResult<()> {
        if bitmap.width != self.width || bitmap.height != self.height {
            return Err(SilhouetteError::raster(
                "mask bitmap size does not match surface",
            ));
        }
        composite::blend_in_place(&mut self.data, &bitmap.data, blend)
    }
}

fn source_pixel(paint: &Paint, x: u32, y: u32) -> [u8; 4] {
    match paint {
        Paint::Solid(color) => color.premultiplied(),
        Paint::Radial {
            center,
            radius,
            stops,
        } => composite::eval_radial(
            *center,
            *radius,
            stops,
            f64::from(x) + 0.5,
            f64::from(y) + 0.5,
        ),
    }
}

fn resample_nearest(image: &FillImage, width: u32, height: u32) -> SilhouetteResult<Vec<u8>> {
    if image.width == 0 || image.height == 0 {
        return Err(SilhouetteError::fill("fill image has no pixels"));
    }
    if image.rgba8_premul.len() != image.width as usize * image.height as usize * 4 {
        return Err(SilhouetteError::fill("fill image byte length mismatch"));
    }

    let mut out = vec![0u8; width as usize * height as usize * 4];
    for y in 0..height {
        let sy = (u64::from(y) * u64::from(image.height) / u64::from(height)) as u32;
        for x in 0..width {
            let sx = (u64::from(x) * u64::from(image.width) / u64::from(width)) as u32;
            let src = ((sy * image.width + sx) * 4) as usize;
            let dst = ((y * width + x) * 4) as usize;
            out[dst..dst + 4].copy_from_slice(&image.rgba8_premul[src..src + 4]);
        }
    }
    Ok(out)
}

fn dims_u16(width: u32, height: u32) -> SilhouetteResult<(u16, u16)> {
    if width == 0 || height == 0 {
        return Err(SilhouetteError::geometry("surface has no area"));
    }
    let w: u16 = width
        .try_into()
        .map_err(|_| SilhouetteError::raster("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SilhouetteError::raster("surface height exceeds u16"))?;
    Ok((w, h))
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
