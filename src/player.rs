use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use crate::{
    assets::cache::AssetCache,
    compose::compositor::{FrameCompositor, Surface},
    document::{
        model::AnimationDocument,
        prepare::{PreparedLayer, prepare_layers},
    },
    export::pipeline::{ExportLock, ExportOptions, run_export},
    foundation::error::LunpoResult,
    overrides::CharacterOverride,
    schedule::looped_frame_time,
};

/// The playback engine: owns the document, prepared layers, asset cache and
/// compositor, and drives looping preview and one-shot export over them.
///
/// `tick` is meant to be called from the host's frame callback; export runs
/// the deterministic frame loop inline. While an export is active, ticks
/// leave the preview surface untouched and a second export request is a
/// no-op.
#[derive(Debug)]
pub struct Player {
    doc: AnimationDocument,
    overrides: CharacterOverride,
    prepared: Vec<PreparedLayer>,
    assets: AssetCache,
    compositor: FrameCompositor,
    exporting: Arc<AtomicBool>,
    started_at: Option<Instant>,
}

impl Player {
    /// Build a player over a loaded document with default overrides.
    pub fn new(doc: AnimationDocument, asset_root: impl Into<PathBuf>) -> Self {
        Self::with_overrides(doc, asset_root, CharacterOverride::default())
    }

    /// Build a player with an initial override snapshot.
    pub fn with_overrides(
        doc: AnimationDocument,
        asset_root: impl Into<PathBuf>,
        overrides: CharacterOverride,
    ) -> Self {
        let prepared = prepare_layers(&doc, &overrides.image_path);
        let mut assets = AssetCache::new(asset_root);
        assets.sync(&prepared);
        let compositor = FrameCompositor::new(doc.comp.width, doc.comp.height, doc.frame_rate());
        Self {
            doc,
            overrides,
            prepared,
            assets,
            compositor,
            exporting: Arc::new(AtomicBool::new(false)),
            started_at: None,
        }
    }

    /// Convenience: load the document from a JSON file first.
    pub fn open(doc_path: impl AsRef<Path>, asset_root: impl Into<PathBuf>) -> LunpoResult<Self> {
        Ok(Self::new(AnimationDocument::load(doc_path)?, asset_root))
    }

    /// The loaded document.
    pub fn document(&self) -> &AnimationDocument {
        &self.doc
    }

    /// Current override snapshot.
    pub fn overrides(&self) -> &CharacterOverride {
        &self.overrides
    }

    /// Replace the override snapshot. A changed substitution image re-runs
    /// layer preparation and reconciles the asset cache; transform and
    /// color knobs take effect on the next rendered frame without reload.
    pub fn set_overrides(&mut self, overrides: CharacterOverride) {
        let image_changed = overrides.image_path != self.overrides.image_path;
        self.overrides = overrides;
        if image_changed {
            self.prepared = prepare_layers(&self.doc, &self.overrides.image_path);
            self.assets.sync(&self.prepared);
        }
    }

    /// Restart the preview loop from frame zero on the next tick.
    pub fn restart(&mut self) {
        self.started_at = None;
    }

    /// Advance the preview: quantize elapsed wall time onto the looping
    /// frame grid and render that frame. Returns the sampled composition
    /// time. The first tick anchors the clock.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let start = *self.started_at.get_or_insert(now);
        let elapsed = now.duration_since(start).as_secs_f64();
        let t = looped_frame_time(elapsed, self.doc.frame_rate(), self.doc.comp.duration);
        if !self.exporting.load(Ordering::SeqCst) {
            self.render_at(t);
        }
        t
    }

    /// Render the composition at an explicit time.
    pub fn render_at(&mut self, t: f64) {
        self.compositor
            .render(t, &self.prepared, &mut self.assets, &self.overrides);
    }

    /// The last rendered frame.
    pub fn surface(&self) -> &Surface {
        self.compositor.surface()
    }

    /// Whether an export is currently running.
    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::SeqCst)
    }

    /// Shared exporting flag, for hosts coordinating UI state across
    /// threads.
    pub fn exporting_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exporting)
    }

    /// Export the composition once through to a file in
    /// `options.out_dir`, returning the artifact path. Returns `Ok(None)`
    /// without side effects when an export is already running.
    pub fn export(&mut self, options: &ExportOptions) -> LunpoResult<Option<PathBuf>> {
        let flag = Arc::clone(&self.exporting);
        let Some(_lock) = ExportLock::try_acquire(&flag) else {
            tracing::warn!("export requested while another export is running, ignoring");
            return Ok(None);
        };
        run_export(
            &self.doc,
            &self.prepared,
            &mut self.assets,
            &self.overrides,
            &mut self.compositor,
            options,
        )
        .map(Some)
    }
}

#[cfg(test)]
#[path = "../tests/unit/player.rs"]
mod tests;
