use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use rayon::prelude::*;

use crate::{
    assets::video::VideoHandle,
    document::prepare::{AssetId, ChromaKey, PreparedLayer, RenderKind},
    foundation::error::{LunpoError, LunpoResult},
    foundation::math::mul_div255_u8,
};

/// A decoded raster ready to draw: premultiplied RGBA8, row-major.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Premultiplied RGBA8 pixels, `width * height * 4` bytes.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// A loaded asset the compositor can draw from.
#[derive(Debug)]
pub enum PreparedAsset {
    /// Decoded still image.
    Image(PreparedImage),
    /// Live video handle with its decode worker.
    Video(VideoHandle),
}

/// Content-addressed asset store keyed by [`AssetId`].
///
/// `sync` reconciles the store against the current prepared-layer set: new
/// keys load in parallel, isolated failures are logged and skipped so one
/// bad asset never blocks the rest, and keys no longer referenced are
/// evicted (dropping a video handle shuts its worker down).
#[derive(Debug)]
pub struct AssetCache {
    root: PathBuf,
    assets: HashMap<AssetId, PreparedAsset>,
}

impl AssetCache {
    /// Create an empty cache resolving relative asset paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            assets: HashMap::new(),
        }
    }

    /// Asset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reconcile the store against the current prepared layers.
    pub fn sync(&mut self, layers: &[PreparedLayer]) {
        let wanted: HashSet<AssetId> = layers.iter().filter_map(PreparedLayer::asset_id).collect();
        self.assets.retain(|id, _| wanted.contains(id));

        let mut pending: Vec<(AssetId, String, RenderKind, Option<ChromaKey>)> = Vec::new();
        let mut seen: HashSet<AssetId> = HashSet::new();
        for layer in layers {
            let (Some(id), Some(path)) = (layer.asset_id(), layer.path.as_deref()) else {
                continue;
            };
            if layer.kind == RenderKind::Skip || self.assets.contains_key(&id) || !seen.insert(id) {
                continue;
            }
            pending.push((id, path.to_string(), layer.kind, layer.chroma));
        }
        if pending.is_empty() {
            return;
        }

        let root = self.root.clone();
        let loaded: Vec<(AssetId, String, LunpoResult<PreparedAsset>)> = pending
            .into_par_iter()
            .map(|(id, path, kind, chroma)| {
                let result = load_asset(&root, &path, kind, chroma);
                (id, path, result)
            })
            .collect();

        for (id, path, result) in loaded {
            match result {
                Ok(asset) => {
                    self.assets.insert(id, asset);
                }
                Err(e) => {
                    tracing::warn!(asset = %path, error = %e, "asset load failed, layer will be skipped");
                }
            }
        }
    }

    /// Look up a loaded asset.
    pub fn get(&self, id: AssetId) -> Option<&PreparedAsset> {
        self.assets.get(&id)
    }

    /// Mutable lookup, used to poll video handles.
    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut PreparedAsset> {
        self.assets.get_mut(&id)
    }

    /// Whether the asset behind `id` finished loading.
    pub fn is_ready(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    /// Number of loaded assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the cache holds no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn load_asset(
    root: &Path,
    rel_path: &str,
    kind: RenderKind,
    chroma: Option<ChromaKey>,
) -> LunpoResult<PreparedAsset> {
    let full = root.join(rel_path);
    match kind {
        RenderKind::Video => Ok(PreparedAsset::Video(VideoHandle::open(&full)?)),
        RenderKind::Image => Ok(PreparedAsset::Image(load_image(&full, chroma)?)),
        RenderKind::Skip => Err(LunpoError::asset_load(format!(
            "layer for '{rel_path}' is not renderable"
        ))),
    }
}

/// Decode an image file, apply chroma keying on straight RGB, then
/// premultiply.
pub fn load_image(path: &Path, chroma: Option<ChromaKey>) -> LunpoResult<PreparedImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read image '{}'", path.display()))
        .map_err(|e| LunpoError::asset_load(format!("{e:#}")))?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| LunpoError::asset_load(format!("decode image '{}': {e}", path.display())))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = rgba.into_raw();

    if let Some(key) = chroma {
        apply_chroma_key(&mut pixels, key);
    }
    premultiply_in_place(&mut pixels);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixels),
    })
}

/// Zero the alpha of every pixel whose straight RGB lies within the key
/// tolerance (squared Euclidean distance, no square root per pixel).
fn apply_chroma_key(straight_rgba: &mut [u8], key: ChromaKey) {
    let tol_sq = key.tolerance * key.tolerance;
    for px in straight_rgba.chunks_exact_mut(4) {
        let dr = px[0] as f64 - key.color[0] as f64;
        let dg = px[1] as f64 - key.color[1] as f64;
        let db = px[2] as f64 - key.color[2] as f64;
        if dr * dr + dg * dg + db * db <= tol_sq {
            px[3] = 0;
        }
    }
}

/// Convert straight-alpha RGBA8 to premultiplied in place. Shared by image
/// decode and video frame decode.
pub(crate) fn premultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        px[0] = mul_div255_u8(u16::from(px[0]), a);
        px[1] = mul_div255_u8(u16::from(px[1]), a);
        px[2] = mul_div255_u8(u16::from(px[2]), a);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
