//! Premultiplied RGBA8 pixel ops for the masking pipeline.
//!
//! The masking techniques only need a handful of Porter-Duff modes: SrcOver
//! for plain fills, DstIn to keep content where a mask has alpha, DstOut to
//! punch the inverted mask out, and SrcIn when a mask bitmap is stamped with
//! the clip paint.

use kurbo::Point;

use crate::{
    error::{SilhouetteError, SilhouetteResult},
    paint::{BlendMode, GradientStop},
};

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

pub fn src_in(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let da = u16::from(dst[3]);
    [
        mul_div255(u16::from(src[0]), da),
        mul_div255(u16::from(src[1]), da),
        mul_div255(u16::from(src[2]), da),
        mul_div255(u16::from(src[3]), da),
    ]
}

pub fn dst_in(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    [
        mul_div255(u16::from(dst[0]), sa),
        mul_div255(u16::from(dst[1]), sa),
        mul_div255(u16::from(dst[2]), sa),
        mul_div255(u16::from(dst[3]), sa),
    ]
}

pub fn dst_out(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let inv = 255u16 - u16::from(src[3]);
    [
        mul_div255(u16::from(dst[0]), inv),
        mul_div255(u16::from(dst[1]), inv),
        mul_div255(u16::from(dst[2]), inv),
        mul_div255(u16::from(dst[3]), inv),
    ]
}

pub fn blend(dst: PremulRgba8, src: PremulRgba8, mode: BlendMode) -> PremulRgba8 {
    match mode {
        BlendMode::SrcOver => over(dst, src),
        BlendMode::SrcIn => src_in(dst, src),
        BlendMode::DstIn => dst_in(dst, src),
        BlendMode::DstOut => dst_out(dst, src),
    }
}

pub fn blend_in_place(dst: &mut [u8], src: &[u8], mode: BlendMode) -> SilhouetteResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SilhouetteError::raster(
            "blend_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = blend([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], mode);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Evaluates a clamped radial gradient at one pixel, returning premultiplied
/// RGBA8. Stops must be sorted by offset; the value clamps at the last stop.
pub fn eval_radial(center: Point, radius: f64, stops: &[GradientStop], x: f64, y: f64) -> PremulRgba8 {
    if stops.is_empty() {
        return [0, 0, 0, 0];
    }
    let d = ((x - center.x).powi(2) + (y - center.y).powi(2)).sqrt();
    let t = if radius > 0.0 { (d / radius).clamp(0.0, 1.0) } else { 1.0 };

    if t <= stops[0].offset {
        return stops[0].color.premultiplied();
    }
    for w in stops.windows(2) {
        let (a, b) = (w[0], w[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            return lerp_premul(a.color.premultiplied(), b.color.premultiplied(), local);
        }
    }
    stops[stops.len() - 1].color.premultiplied()
}

fn lerp_premul(a: PremulRgba8, b: PremulRgba8, t: f64) -> PremulRgba8 {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = f64::from(a[i]);
        let bv = f64::from(b[i]);
        out[i] = (av + (bv - av) * t).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Rgba8;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        assert_eq!(over(dst, [255, 255, 255, 0]), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let src = [255, 0, 0, 255];
        assert_eq!(over([0, 0, 0, 255], src), src);
    }

    #[test]
    fn dst_in_keeps_dst_where_src_opaque() {
        let dst = [10, 20, 30, 255];
        assert_eq!(dst_in(dst, [0, 0, 0, 255]), dst);
        assert_eq!(dst_in(dst, [0, 0, 0, 0]), [0, 0, 0, 0]);
    }

    #[test]
    fn dst_out_erases_dst_where_src_opaque() {
        let dst = [10, 20, 30, 255];
        assert_eq!(dst_out(dst, [0, 0, 0, 255]), [0, 0, 0, 0]);
        assert_eq!(dst_out(dst, [0, 0, 0, 0]), dst);
    }

    #[test]
    fn src_in_keeps_src_where_dst_opaque() {
        let src = [40, 50, 60, 255];
        assert_eq!(src_in([0, 0, 0, 255], src), src);
        assert_eq!(src_in([0, 0, 0, 0], src), [0, 0, 0, 0]);
    }

    #[test]
    fn blend_in_place_rejects_mismatched_buffers() {
        let mut dst = vec![0u8; 8];
        let src = vec![0u8; 4];
        assert!(blend_in_place(&mut dst, &src, BlendMode::SrcOver).is_err());
    }

    #[test]
    fn radial_is_transparent_inside_and_fill_outside() {
        let stops = [
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
                color: Rgba8::BLACK,
            },
        ];
        let center = Point::new(50.0, 50.0);
        assert_eq!(eval_radial(center, 40.0, &stops, 50.0, 50.0)[3], 0);
        assert_eq!(eval_radial(center, 40.0, &stops, 55.0, 50.0)[3], 0);
        assert_eq!(eval_radial(center, 40.0, &stops, 120.0, 50.0)[3], 255);
    }

    #[test]
    fn radial_zero_radius_is_all_fill() {
        let stops = [
            GradientStop {
                offset: 0.0,
                color: Rgba8::TRANSPARENT,
            },
            GradientStop {
                offset: 1.0,
                color: Rgba8::BLACK,
            },
        ];
        assert_eq!(
            eval_radial(Point::new(0.0, 0.0), 0.0, &stops, 10.0, 10.0)[3],
            255
        );
    }
}
