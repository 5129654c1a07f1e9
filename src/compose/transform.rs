use kurbo::{Affine, Vec2};

use crate::{document::model::Layer, overrides::OverrideTransform};

/// Resolved 2D placement of a layer at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerTransform {
    /// Anchor point in source-image pixels.
    pub anchor: Vec2,
    /// Position of the anchor in composition pixels.
    pub position: Vec2,
    /// Horizontal scale factor (1.0 = unchanged, negative mirrors).
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in radians.
    pub rotation: f64,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            anchor: Vec2::ZERO,
            position: Vec2::ZERO,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }
}

impl LayerTransform {
    /// Source-to-composition mapping: translate to position, rotate, scale,
    /// then shift the anchor to the origin. Matches the fixed canvas order
    /// `translate * rotate * scale * translate(-anchor)`.
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.position)
            * Affine::rotate(self.rotation)
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
            * Affine::translate(-self.anchor)
    }
}

fn axis(v: &[f64], i: usize) -> f64 {
    v.get(i).copied().unwrap_or(0.0)
}

/// Resolve a layer's transform at time `t` from its animated tracks.
///
/// When `character` is set, the layer additionally gets its anchor
/// re-centered on the substituted artwork and a uniform normalization scale
/// so any override image occupies the slot the document authored, followed
/// by the user's transform knobs.
pub fn resolve_transform(
    layer: &Layer,
    t: f64,
    character: Option<CharacterFit<'_>>,
) -> LayerTransform {
    let group = layer.transform.as_ref();

    let anchor_v = group
        .and_then(|g| g.anchor_point.as_ref())
        .and_then(|p| p.value_at(t))
        .unwrap_or_default();
    let position_v = group
        .and_then(|g| g.position.as_ref())
        .and_then(|p| p.value_at(t))
        .unwrap_or_default();
    let scale_v = group
        .and_then(|g| g.scale.as_ref())
        .and_then(|p| p.value_at(t))
        .unwrap_or_else(|| vec![100.0, 100.0]);
    let rotation_deg = group
        .and_then(|g| g.rotation.as_ref())
        .and_then(|p| p.value_at(t))
        .unwrap_or(0.0);

    let mut out = LayerTransform {
        anchor: Vec2::new(axis(&anchor_v, 0), axis(&anchor_v, 1)),
        position: Vec2::new(axis(&position_v, 0), axis(&position_v, 1)),
        scale_x: axis(&scale_v, 0) / 100.0,
        scale_y: axis(&scale_v, 1) / 100.0,
        rotation: rotation_deg.to_radians(),
    };

    if let Some(fit) = character {
        apply_character_fit(&mut out, &fit);
    }

    out
}

/// Substitution geometry for the character layer.
#[derive(Clone, Copy, Debug)]
pub struct CharacterFit<'a> {
    /// Dimensions of the substituted image.
    pub asset_size: (u32, u32),
    /// Footage dimensions the document was authored against, when known.
    pub reference_size: Option<(u32, u32)>,
    /// Host-controlled knobs.
    pub user: &'a OverrideTransform,
}

fn apply_character_fit(t: &mut LayerTransform, fit: &CharacterFit<'_>) {
    let (aw, ah) = fit.asset_size;
    // Re-center on the substituted artwork regardless of the authored anchor.
    t.anchor = Vec2::new(f64::from(aw) / 2.0, f64::from(ah) / 2.0);

    // Uniform height normalization so arbitrary artwork fills the authored slot.
    if let Some((_, rh)) = fit.reference_size
        && rh > 0
        && ah > 0
    {
        let norm = f64::from(rh) / f64::from(ah);
        t.scale_x *= norm;
        t.scale_y *= norm;
    }

    let user = fit.user;
    t.position += Vec2::new(user.offset_x, user.offset_y);
    t.rotation += user.rotation.to_radians();
    let user_scale = user.scale / 100.0;
    t.scale_x *= user_scale;
    t.scale_y *= user_scale;
    if user.flip_x {
        t.scale_x = -t.scale_x;
    }
    if user.flip_y {
        t.scale_y = -t.scale_y;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/transform.rs"]
mod tests;
