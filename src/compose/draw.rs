use kurbo::{Affine, Point};

use crate::{
    assets::cache::PreparedImage,
    compose::{
        blend::{BlendMode, blend_pixel},
        color::ColorFilter,
        compositor::Surface,
    },
    foundation::math::{mul_div255_u8, unpremul_u8},
};

/// Draw `image` onto `surface` under `transform` (source pixels to surface
/// pixels).
///
/// Rasterization walks the transformed bounding box and inverse-maps each
/// surface pixel into the source, sampling bilinearly on premultiplied
/// channels; samples outside the source are transparent. The optional color
/// filter runs on the straight color of each sample before compositing.
pub fn draw_image(
    surface: &mut Surface,
    image: &PreparedImage,
    transform: Affine,
    opacity_u8: u8,
    mode: BlendMode,
    filter: Option<&ColorFilter>,
) {
    if opacity_u8 == 0 || image.width == 0 || image.height == 0 {
        return;
    }
    let inverse = transform.inverse();

    let (x0, y0, x1, y1) = match dest_bounds(surface, image, transform) {
        Some(b) => b,
        None => return,
    };

    let src_w = image.width as usize;
    let src_h = image.height as usize;
    let src = image.rgba8_premul.as_slice();
    let dst_w = surface.width() as usize;

    for dy in y0..y1 {
        let row = surface.data_mut();
        for dx in x0..x1 {
            // Sample at the pixel center.
            let p = inverse * Point::new(dx as f64 + 0.5, dy as f64 + 0.5);
            let mut px = match sample_bilinear(src, src_w, src_h, p.x, p.y) {
                Some(px) => px,
                None => continue,
            };
            if px[3] == 0 {
                continue;
            }
            if let Some(f) = filter {
                px = filter_premul(px, f);
            }

            let o = (dy * dst_w + dx) * 4;
            let dst_px = [row[o], row[o + 1], row[o + 2], row[o + 3]];
            let out = blend_pixel(dst_px, px, mode, opacity_u8);
            row[o..o + 4].copy_from_slice(&out);
        }
    }
}

/// Blit a full-surface cached layer rendering over the target with the
/// layer's opacity and blend mode. Both surfaces must share dimensions.
pub fn blit_surface(surface: &mut Surface, cached: &Surface, opacity_u8: u8, mode: BlendMode) {
    debug_assert_eq!(surface.width(), cached.width());
    debug_assert_eq!(surface.height(), cached.height());
    if opacity_u8 == 0 {
        return;
    }
    let src = cached.data();
    let dst = surface.data_mut();
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 && mode == BlendMode::Normal {
            continue;
        }
        let out = blend_pixel([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], mode, opacity_u8);
        d.copy_from_slice(&out);
    }
}

fn dest_bounds(
    surface: &Surface,
    image: &PreparedImage,
    transform: Affine,
) -> Option<(usize, usize, usize, usize)> {
    let w = f64::from(image.width);
    let h = f64::from(image.height);
    let corners = [
        transform * Point::new(0.0, 0.0),
        transform * Point::new(w, 0.0),
        transform * Point::new(0.0, h),
        transform * Point::new(w, h),
    ];
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let x0 = min_x.floor().max(0.0) as usize;
    let y0 = min_y.floor().max(0.0) as usize;
    let x1 = (max_x.ceil().max(0.0) as usize).min(surface.width() as usize);
    let y1 = (max_y.ceil().max(0.0) as usize).min(surface.height() as usize);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

/// Bilinear sample at `(x, y)` in image space `[0, w] x [0, h]`.
///
/// Points outside the image footprint are transparent (crisp edges);
/// sampling inside clamps to the edge texels so upscaled images do not fade
/// at their borders.
fn sample_bilinear(src: &[u8], w: usize, h: usize, x: f64, y: f64) -> Option<[u8; 4]> {
    if !(x >= 0.0 && y >= 0.0 && x <= w as f64 && y <= h as f64) {
        return None;
    }
    let sx = (x - 0.5).clamp(0.0, (w - 1) as f64);
    let sy = (y - 0.5).clamp(0.0, (h - 1) as f64);
    let ix = sx.floor() as usize;
    let iy = sy.floor() as usize;
    let tx = sx - ix as f64;
    let ty = sy - iy as f64;
    let ix1 = (ix + 1).min(w - 1);
    let iy1 = (iy + 1).min(h - 1);

    let fetch = |px: usize, py: usize| -> [f64; 4] {
        let o = (py * w + px) * 4;
        [
            f64::from(src[o]),
            f64::from(src[o + 1]),
            f64::from(src[o + 2]),
            f64::from(src[o + 3]),
        ]
    };

    let p00 = fetch(ix, iy);
    let p10 = fetch(ix1, iy);
    let p01 = fetch(ix, iy1);
    let p11 = fetch(ix1, iy1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * tx;
        let bot = p01[c] + (p11[c] - p01[c]) * tx;
        out[c] = (top + (bot - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

/// Run the color filter on a premultiplied pixel: unpremultiply, transform
/// the straight color, re-premultiply.
fn filter_premul(px: [u8; 4], filter: &ColorFilter) -> [u8; 4] {
    let a = px[3];
    if a == 0 {
        return px;
    }
    let straight = [
        f32::from(unpremul_u8(px[0], a)) / 255.0,
        f32::from(unpremul_u8(px[1], a)) / 255.0,
        f32::from(unpremul_u8(px[2], a)) / 255.0,
    ];
    let out = filter.apply(straight);
    let av = u16::from(a);
    [
        mul_div255_u8((out[0] * 255.0 + 0.5) as u16, av),
        mul_div255_u8((out[1] * 255.0 + 0.5) as u16, av),
        mul_div255_u8((out[2] * 255.0 + 0.5) as u16, av),
        a,
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/compose/draw.rs"]
mod tests;
