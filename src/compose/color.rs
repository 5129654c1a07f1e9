use crate::overrides::ColorAdjust;

/// Rec. 601-style luminance weights used by the filter matrices.
const LUM_R: f32 = 0.213;
const LUM_G: f32 = 0.715;
const LUM_B: f32 = 0.072;

type Mat3 = [[f32; 3]; 3];

/// A combined affine color transform on straight (non-premultiplied) RGB in
/// `[0, 1]`: `v' = m * v + offset`, applied in the fixed order hue-rotate,
/// saturate, brightness, contrast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorFilter {
    m: Mat3,
    offset: [f32; 3],
}

impl ColorFilter {
    /// Fold the adjust knobs into one matrix; `None` when the adjustment is
    /// neutral so the per-pixel path can be skipped entirely.
    pub fn from_adjust(adjust: &ColorAdjust) -> Option<Self> {
        if adjust.is_neutral() {
            return None;
        }

        let hue = hue_rotate_matrix(adjust.hue.to_radians() as f32);
        let sat = saturate_matrix((adjust.saturation / 100.0) as f32);
        let brightness = (adjust.brightness / 100.0) as f32;
        let contrast = (adjust.contrast / 100.0) as f32;

        // contrast(brightness(saturate(hue(v)))), with contrast the only
        // stage carrying an offset.
        let mut m = mat_mul(&sat, &hue);
        for row in &mut m {
            for v in row.iter_mut() {
                *v *= brightness * contrast;
            }
        }
        let offset = [0.5 - 0.5 * contrast; 3];

        Some(Self { m, offset })
    }

    /// Apply to one straight RGB triple, clamping to `[0, 1]`.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        for (i, row) in self.m.iter().enumerate() {
            out[i] = (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2] + self.offset[i])
                .clamp(0.0, 1.0);
        }
        out
    }
}

fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0f32; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

fn saturate_matrix(s: f32) -> Mat3 {
    [
        [LUM_R + (1.0 - LUM_R) * s, LUM_G - LUM_G * s, LUM_B - LUM_B * s],
        [LUM_R - LUM_R * s, LUM_G + (1.0 - LUM_G) * s, LUM_B - LUM_B * s],
        [LUM_R - LUM_R * s, LUM_G - LUM_G * s, LUM_B + (1.0 - LUM_B) * s],
    ]
}

fn hue_rotate_matrix(rad: f32) -> Mat3 {
    let (sin, cos) = rad.sin_cos();
    [
        [
            LUM_R + cos * (1.0 - LUM_R) - sin * LUM_R,
            LUM_G - cos * LUM_G - sin * LUM_G,
            LUM_B - cos * LUM_B + sin * (1.0 - LUM_B),
        ],
        [
            LUM_R - cos * LUM_R + sin * 0.143,
            LUM_G + cos * (1.0 - LUM_G) + sin * 0.140,
            LUM_B - cos * LUM_B - sin * 0.283,
        ],
        [
            LUM_R - cos * LUM_R - sin * (1.0 - LUM_R),
            LUM_G - cos * LUM_G + sin * LUM_G,
            LUM_B + cos * (1.0 - LUM_B) + sin * LUM_B,
        ],
    ]
}
