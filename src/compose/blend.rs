use crate::foundation::math::{mul_div255_u16, unpremul_u8};

/// Supported layer blend modes; anything unrecognized falls back to
/// [`BlendMode::Normal`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Premultiplied source-over.
    #[default]
    Normal,
    /// Additive (saturating channel add).
    Lighter,
    /// Separable screen.
    Screen,
    /// Separable multiply.
    Multiply,
    /// Separable overlay.
    Overlay,
    /// Separable per-channel minimum.
    Darken,
    /// Separable per-channel maximum.
    Lighten,
}

/// Map a document blend-mode identifier onto a supported mode.
pub fn parse_blend_mode(name: &str) -> BlendMode {
    match name {
        "ADD" => BlendMode::Lighter,
        "SCREEN" => BlendMode::Screen,
        "MULTIPLY" => BlendMode::Multiply,
        "OVERLAY" => BlendMode::Overlay,
        "DARKEN" => BlendMode::Darken,
        "LIGHTEN" => BlendMode::Lighten,
        _ => BlendMode::Normal,
    }
}

/// Composite a premultiplied source pixel over a premultiplied destination.
///
/// `opacity_u8` scales the source before compositing (255 = opaque).
pub fn blend_pixel(dst: [u8; 4], src: [u8; 4], mode: BlendMode, opacity_u8: u8) -> [u8; 4] {
    let src = scale_premul(src, opacity_u8);
    match mode {
        BlendMode::Normal => source_over(dst, src),
        BlendMode::Lighter => [
            dst[0].saturating_add(src[0]),
            dst[1].saturating_add(src[1]),
            dst[2].saturating_add(src[2]),
            dst[3].saturating_add(src[3]),
        ],
        BlendMode::Screen => separable(dst, src, |b, s| b + s - b * s),
        BlendMode::Multiply => separable(dst, src, |b, s| b * s),
        BlendMode::Overlay => separable(dst, src, |b, s| {
            if b <= 0.5 {
                2.0 * b * s
            } else {
                1.0 - 2.0 * (1.0 - b) * (1.0 - s)
            }
        }),
        BlendMode::Darken => separable(dst, src, f32::min),
        BlendMode::Lighten => separable(dst, src, f32::max),
    }
}

fn scale_premul(px: [u8; 4], factor: u8) -> [u8; 4] {
    if factor == 255 {
        return px;
    }
    let f = u16::from(factor);
    [
        mul_div255_u16(u16::from(px[0]), f) as u8,
        mul_div255_u16(u16::from(px[1]), f) as u8,
        mul_div255_u16(u16::from(px[2]), f) as u8,
        mul_div255_u16(u16::from(px[3]), f) as u8,
    ]
}

fn source_over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let inv = 255 - u16::from(src[3]);
    [
        src[0].saturating_add(mul_div255_u16(u16::from(dst[0]), inv) as u8),
        src[1].saturating_add(mul_div255_u16(u16::from(dst[1]), inv) as u8),
        src[2].saturating_add(mul_div255_u16(u16::from(dst[2]), inv) as u8),
        src[3].saturating_add(mul_div255_u16(u16::from(dst[3]), inv) as u8),
    ]
}

/// Separable blend per the compositing model: unpremultiply both operands,
/// blend the straight colors with `f`, then mix by coverage and
/// re-premultiply.
fn separable(dst: [u8; 4], src: [u8; 4], f: impl Fn(f32, f32) -> f32) -> [u8; 4] {
    let ab = f32::from(dst[3]) / 255.0;
    let asr = f32::from(src[3]) / 255.0;
    if asr <= 0.0 {
        return dst;
    }

    let cb = straight_f32(dst);
    let cs = straight_f32(src);

    let ao = asr + ab * (1.0 - asr);
    let mut out = [0u8; 4];
    for i in 0..3 {
        let blended = f(cb[i], cs[i]).clamp(0.0, 1.0);
        // co is premultiplied by construction.
        let co = asr * (1.0 - ab) * cs[i] + asr * ab * blended + (1.0 - asr) * ab * cb[i];
        out[i] = (co * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
    }
    out[3] = (ao * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
    out
}

fn straight_f32(px: [u8; 4]) -> [f32; 3] {
    [
        f32::from(unpremul_u8(px[0], px[3])) / 255.0,
        f32::from(unpremul_u8(px[1], px[3])) / 255.0,
        f32::from(unpremul_u8(px[2], px[3])) / 255.0,
    ]
}
