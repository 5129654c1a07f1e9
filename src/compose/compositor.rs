use std::collections::HashMap;

use crate::{
    assets::cache::{AssetCache, PreparedAsset},
    compose::{
        blend::{BlendMode, parse_blend_mode},
        color::ColorFilter,
        draw::{blit_surface, draw_image},
        transform::{CharacterFit, resolve_transform},
    },
    document::prepare::{AssetId, PreparedLayer, RenderKind},
    overrides::CharacterOverride,
};

/// A CPU pixel target: premultiplied RGBA8, row-major, fully transparent
/// after [`Surface::clear`].
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied RGBA8 pixels.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel access.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

/// Renders one composition frame at a time onto an owned [`Surface`].
///
/// Stateless across frames except for the per-asset video frame cache: while
/// a video seek is pending, the layer's last successful rendering is blitted
/// in place of live pixels so playback never flashes.
#[derive(Debug)]
pub struct FrameCompositor {
    frame_rate: f64,
    surface: Surface,
    video_frame_cache: HashMap<AssetId, Surface>,
}

impl FrameCompositor {
    /// Create a compositor for a composition of the given pixel size and
    /// frame rate.
    pub fn new(width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            frame_rate,
            surface: Surface::new(width, height),
            video_frame_cache: HashMap::new(),
        }
    }

    /// The rendered frame.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Render the composition at time `t` (seconds).
    ///
    /// Layers paint in descending stacking index so lower indices land on
    /// top. A layer outside its visibility window, without a loaded asset,
    /// or (for videos) without pixels at the target time contributes
    /// nothing; the frame never fails.
    pub fn render(
        &mut self,
        t: f64,
        layers: &[PreparedLayer],
        assets: &mut AssetCache,
        overrides: &CharacterOverride,
    ) {
        self.surface.clear();

        let filter = ColorFilter::from_adjust(&overrides.color_adjust);

        let mut order: Vec<&PreparedLayer> = layers
            .iter()
            .filter(|p| p.kind != RenderKind::Skip)
            .collect();
        order.sort_by_key(|p| std::cmp::Reverse(p.layer.index));

        for prepared in order {
            if !prepared.layer.visible_at(t) {
                continue;
            }
            let Some(id) = prepared.asset_id() else {
                continue;
            };
            match prepared.kind {
                RenderKind::Image => self.render_image(t, prepared, id, assets, overrides, filter.as_ref()),
                RenderKind::Video => self.render_video(t, prepared, id, assets, filter.as_ref()),
                RenderKind::Skip => {}
            }
        }
    }

    fn layer_opacity_u8(prepared: &PreparedLayer, t: f64) -> u8 {
        let pct = prepared
            .layer
            .transform
            .as_ref()
            .and_then(|g| g.opacity.as_ref())
            .and_then(|p| p.value_at(t))
            .unwrap_or(100.0);
        (pct.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8
    }

    fn render_image(
        &mut self,
        t: f64,
        prepared: &PreparedLayer,
        id: AssetId,
        assets: &AssetCache,
        overrides: &CharacterOverride,
        filter: Option<&ColorFilter>,
    ) {
        let Some(PreparedAsset::Image(image)) = assets.get(id) else {
            return;
        };

        let character_fit = prepared.is_character.then(|| CharacterFit {
            asset_size: (image.width, image.height),
            reference_size: prepared.layer.source.as_ref().and_then(|s| {
                s.width.zip(s.height)
            }),
            user: &overrides.transform,
        });
        // User color adjust applies to the scene, never to the character.
        let filter = if prepared.is_character { None } else { filter };

        let transform = resolve_transform(&prepared.layer, t, character_fit);
        let opacity = Self::layer_opacity_u8(prepared, t);
        let mode = parse_blend_mode(&prepared.layer.blend_mode);
        draw_image(
            &mut self.surface,
            image,
            transform.to_affine(),
            opacity,
            mode,
            filter,
        );
    }

    fn render_video(
        &mut self,
        t: f64,
        prepared: &PreparedLayer,
        id: AssetId,
        assets: &mut AssetCache,
        filter: Option<&ColorFilter>,
    ) {
        let Some(PreparedAsset::Video(handle)) = assets.get_mut(id) else {
            return;
        };
        handle.poll();

        let target = self.video_target_time(&prepared.layer, t, handle.duration_sec());
        let frame_step = 1.0 / self.frame_rate;
        let in_sync = handle
            .position()
            .is_some_and(|pos| (pos - target).abs() <= frame_step / 2.0);
        if !handle.is_seeking() && !in_sync {
            handle.request_seek(target);
        }

        let opacity = Self::layer_opacity_u8(prepared, t);
        let mode = parse_blend_mode(&prepared.layer.blend_mode);

        if !handle.is_seeking()
            && in_sync
            && let Some(frame) = handle.current_frame()
        {
            let transform = resolve_transform(&prepared.layer, t, None).to_affine();
            // Re-render the layer into its cache so pending seeks later have
            // pixels to show.
            let cached = self
                .video_frame_cache
                .entry(id)
                .or_insert_with(|| Surface::new(self.surface.width(), self.surface.height()));
            cached.clear();
            draw_image(cached, frame, transform, 255, BlendMode::Normal, filter);
            blit_surface(&mut self.surface, cached, opacity, mode);
        } else if let Some(cached) = self.video_frame_cache.get(&id) {
            blit_surface(&mut self.surface, cached, opacity, mode);
        }
    }

    /// Map composition time onto clip time: start offset and stretch, or the
    /// time-remap curve when present, clamped to the clip and quantized to
    /// the output frame grid. A remap track that yields no value pins the
    /// clip to 0, it does not fall back to natural time.
    fn video_target_time(&self, layer: &crate::document::model::Layer, t: f64, duration: f64) -> f64 {
        let raw = match &layer.time_remap {
            Some(remap) => remap.value_at(t).unwrap_or(0.0),
            None => (t - layer.start_time) * (layer.stretch / 100.0),
        };
        let clamped = raw.clamp(0.0, duration.max(0.0));
        (clamped * self.frame_rate).round() / self.frame_rate
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
