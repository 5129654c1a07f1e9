use crate::{
    document::model::{AnimationDocument, EffectProperty, Layer, ScalarOrVec},
    foundation::math::Fnv1a64,
    overrides::normalize_asset_path,
};

/// Layer name marker for the substitutable character cut-in.
const CHARACTER_MARKER: &str = "RefuteCutIn";
/// Overlay layers sharing the character naming but never substituted.
const CHARACTER_EXCLUDE: &str = "StainedGlass";
/// The one nested comp rendered as a pre-baked transition clip.
const FINAL_MARKER: &str = "破碎final";
/// Reverse-playback marker inside transition layer names.
const REVERSE_MARKER: &str = "反";
/// Chroma-key effect identifier and its parameter slots.
const COLOR_KEY_EFFECT: &str = "ADBE Color Key";
const COLOR_KEY_COLOR: &str = "ADBE Color Key-0001";
const COLOR_KEY_TOLERANCE: &str = "ADBE Color Key-0002";

const FORWARD_CLIP: &str = "lunpo/forward.webm";
const REVERSE_CLIP: &str = "lunpo/reverse.webm";

/// Render classification of a prepared layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderKind {
    /// Still raster image drawn every frame.
    Image,
    /// Looping video clip with polled seek synchronization.
    Video,
    /// Never rendered (solids, unsupported nested comps, missing sources).
    Skip,
}

/// Chroma-key settings resolved from a layer's effect tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChromaKey {
    /// Key color as 0–255 RGB.
    pub color: [u8; 3],
    /// Euclidean RGB distance tolerance.
    pub tolerance: f64,
}

/// Stable content-identity key for a cached asset: resolved path plus a
/// fingerprint of any pixel post-processing, so two differently keyed uses
/// of the same file cache separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Normalized asset path relative to the asset root.
    pub path: String,
    /// Canonicalized post-processing parameters.
    pub params: Vec<(String, String)>,
}

/// Stable hashed identifier derived from a [`CacheKey`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetId(pub(crate) u64);

impl AssetId {
    /// Access raw 64-bit identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl CacheKey {
    /// Build a key with lexicographically sorted params.
    pub fn new(path: String, mut params: Vec<(String, String)>) -> Self {
        params.sort();
        Self { path, params }
    }

    /// Derive the hashed [`AssetId`] for this key.
    pub fn id(&self) -> AssetId {
        let mut hasher = Fnv1a64::new_default();
        hasher.write_bytes(self.path.as_bytes());
        hasher.write_u8(0);
        for (k, v) in &self.params {
            hasher.write_bytes(k.as_bytes());
            hasher.write_u8(0);
            hasher.write_bytes(v.as_bytes());
            hasher.write_u8(0);
        }
        AssetId(hasher.finish())
    }
}

/// Render-relevant classification of one document layer, computed once per
/// document/override change and never re-derived per frame.
#[derive(Clone, Debug)]
pub struct PreparedLayer {
    /// The underlying document layer.
    pub layer: Layer,
    /// Render classification.
    pub kind: RenderKind,
    /// Resolved asset path relative to the asset root, when renderable.
    pub path: Option<String>,
    /// Cache identity, when renderable.
    pub key: Option<CacheKey>,
    /// Whether this is the substitutable character layer.
    pub is_character: bool,
    /// Chroma-key settings, when the layer carries the keying effect.
    pub chroma: Option<ChromaKey>,
}

impl PreparedLayer {
    /// Hashed cache id, when renderable.
    pub fn asset_id(&self) -> Option<AssetId> {
        self.key.as_ref().map(CacheKey::id)
    }
}

/// Whether a layer name denotes the substitutable character cut-in.
pub fn is_character_layer(name: &str) -> bool {
    name.contains(CHARACTER_MARKER) && !name.contains(CHARACTER_EXCLUDE)
}

fn is_solid_layer(layer: &Layer) -> bool {
    layer
        .source
        .as_ref()
        .is_some_and(|s| s.path.is_none() && s.kind == "Footage")
}

/// Classify every document layer against the current character override.
///
/// Rebuilt synchronously whenever the document or the override image
/// changes; the output order matches the document order.
pub fn prepare_layers(doc: &AnimationDocument, override_image: &str) -> Vec<PreparedLayer> {
    doc.comp
        .layers
        .iter()
        .map(|layer| prepare_layer(layer, override_image))
        .collect()
}

fn prepare_layer(layer: &Layer, override_image: &str) -> PreparedLayer {
    let is_solid = is_solid_layer(layer);
    let is_character = is_character_layer(&layer.name);
    let chroma = chroma_key_settings(layer);

    let path = if is_character {
        let p = normalize_asset_path(override_image);
        if p.is_empty() { None } else { Some(p) }
    } else {
        resolve_asset_path(layer)
    };

    let kind = match &path {
        Some(p) if p.ends_with(".webm") => RenderKind::Video,
        Some(_) => RenderKind::Image,
        None => RenderKind::Skip,
    };

    let is_precomp = layer.source.as_ref().is_some_and(|s| s.kind == "Comp");
    let skip = path.is_none() || is_solid || (is_precomp && !layer.name.contains(FINAL_MARKER));
    let kind = if skip { RenderKind::Skip } else { kind };

    let key = path.as_ref().map(|p| {
        // Videos are never chroma-keyed; only keyed images fork the cache.
        match (&chroma, kind) {
            (Some(ck), RenderKind::Image) => CacheKey::new(
                p.clone(),
                vec![
                    (
                        "colorkey".to_string(),
                        format!("{},{},{}", ck.color[0], ck.color[1], ck.color[2]),
                    ),
                    ("tolerance".to_string(), format!("{}", ck.tolerance)),
                ],
            ),
            _ => CacheKey::new(p.clone(), vec![]),
        }
    });

    PreparedLayer {
        layer: layer.clone(),
        kind,
        path,
        key,
        is_character,
        chroma,
    }
}

/// Resolve a non-character layer's asset path.
///
/// The reserved transition clip (a `.mov` source or the final-marker comp)
/// maps to one of two fixed looping clips chosen by the reverse marker or a
/// negative stretch; everything else resolves under its `assets-*` folder
/// identity, falling back to a flat name-keyed path.
fn resolve_asset_path(layer: &Layer) -> Option<String> {
    let name = match &layer.source {
        Some(s) if !s.name.is_empty() => s.name.clone(),
        _ => layer.name.clone(),
    };
    if name.is_empty() {
        return None;
    }

    if name.ends_with(".mov") || name.contains(FINAL_MARKER) {
        let reverse = name.contains(REVERSE_MARKER) || layer.stretch < 0.0;
        return Some(if reverse { REVERSE_CLIP } else { FORWARD_CLIP }.to_string());
    }

    if let Some(folder) = layer
        .source
        .as_ref()
        .and_then(|s| s.path.as_deref())
        .and_then(assets_folder_component)
    {
        return Some(format!("lunpo/{folder}/{name}"));
    }

    Some(format!("lunpo/{name}"))
}

/// Find the `assets-*` folder component of a source path, tolerating both
/// separator styles.
fn assets_folder_component(path: &str) -> Option<String> {
    path.replace('\\', "/")
        .split('/')
        .find(|part| part.starts_with("assets-"))
        .map(str::to_string)
}

/// Extract chroma-key settings from a layer's effect list, if present.
pub fn chroma_key_settings(layer: &Layer) -> Option<ChromaKey> {
    let effect = layer
        .effects
        .iter()
        .find(|e| e.match_name == COLOR_KEY_EFFECT)?;

    let color = match find_effect_value(&effect.properties, COLOR_KEY_COLOR)? {
        ScalarOrVec::Vec(v) if v.len() >= 3 => {
            let mut rgb = [0u8; 3];
            for (dst, src) in rgb.iter_mut().zip(v.iter()) {
                *dst = (src * 255.0).round().clamp(0.0, 255.0) as u8;
            }
            rgb
        }
        _ => return None,
    };

    let tolerance = match find_effect_value(&effect.properties, COLOR_KEY_TOLERANCE) {
        Some(ScalarOrVec::Scalar(v)) => *v,
        _ => 0.0,
    };

    Some(ChromaKey { color, tolerance })
}

fn find_effect_value<'a>(
    properties: &'a [EffectProperty],
    match_name: &str,
) -> Option<&'a ScalarOrVec> {
    for prop in properties {
        if prop.match_name == match_name
            && let Some(v) = prop.value.as_ref().and_then(|v| v.static_value.as_ref())
        {
            return Some(v);
        }
        if let Some(nested) = find_effect_value(&prop.properties, match_name) {
            return Some(nested);
        }
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/document/prepare.rs"]
mod tests;
