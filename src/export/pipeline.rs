use std::{
    io::Write,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    assets::cache::AssetCache,
    compose::compositor::FrameCompositor,
    document::{model::AnimationDocument, prepare::PreparedLayer},
    encode::ffmpeg::{AudioInput, FfmpegRecorder, RecorderConfig, decode_audio_f32le, select_encoder},
    foundation::error::{LunpoError, LunpoResult},
    overrides::CharacterOverride,
    schedule::total_frames,
};

/// Fixed soundtrack path relative to the asset root.
pub const AUDIO_CLIP: &str = "lunpo/audio.mp3";
/// Artifact file-name prefix.
const ARTIFACT_PREFIX: &str = "lunpo";

const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_CHANNELS: u16 = 2;

/// Export parameters.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Directory receiving the finished artifact.
    pub out_dir: PathBuf,
    /// Soundtrack path relative to the asset root; `None` uses the
    /// composition's fixed clip.
    pub audio_path: Option<String>,
}

/// RAII guard over the shared exporting flag; acquisition is a single
/// compare-and-swap so two concurrent exports can never both win.
pub(crate) struct ExportLock<'a>(&'a AtomicBool);

impl<'a> ExportLock<'a> {
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ExportLock<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Render the whole composition once through and encode it to a file.
///
/// The frame loop is deterministic: every frame index on the output grid is
/// rendered exactly once in order, so two exports of the same document and
/// overrides produce identical frame sequences regardless of host load.
pub(crate) fn run_export(
    doc: &AnimationDocument,
    layers: &[PreparedLayer],
    assets: &mut AssetCache,
    overrides: &CharacterOverride,
    compositor: &mut FrameCompositor,
    options: &ExportOptions,
) -> LunpoResult<PathBuf> {
    let frame_rate = doc.frame_rate();
    let duration = doc.comp.duration;
    let frames = total_frames(duration, frame_rate);

    let audio_rel = options.audio_path.as_deref().unwrap_or(AUDIO_CLIP);
    let audio_file = stage_audio(assets, audio_rel, duration)?;

    let choice = select_encoder()?;
    let out_path = options.out_dir.join(format!(
        "{ARTIFACT_PREFIX}-{}.{}",
        epoch_millis(),
        choice.container_ext
    ));

    let cfg = RecorderConfig {
        width: compositor.surface().width(),
        height: compositor.surface().height(),
        fps: frame_rate,
        out_path: out_path.clone(),
        choice,
        audio: Some(AudioInput {
            path: audio_file.path().to_path_buf(),
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: AUDIO_CHANNELS,
        }),
    };

    tracing::info!(
        frames,
        fps = frame_rate,
        out = %out_path.display(),
        "starting export"
    );

    let result = drive_frames(doc, layers, assets, overrides, compositor, &cfg, frames);
    match result {
        Ok(path) => {
            tracing::info!(out = %path.display(), "export finished");
            Ok(path)
        }
        Err(e) => {
            // Never leave a half-written artifact behind.
            let _ = std::fs::remove_file(&out_path);
            Err(e)
        }
    }
}

fn drive_frames(
    doc: &AnimationDocument,
    layers: &[PreparedLayer],
    assets: &mut AssetCache,
    overrides: &CharacterOverride,
    compositor: &mut FrameCompositor,
    cfg: &RecorderConfig,
    frames: u64,
) -> LunpoResult<PathBuf> {
    let frame_rate = doc.frame_rate();
    let mut recorder = FfmpegRecorder::start(cfg)?;

    // Frame indices step the grid directly, which is the clamped-time
    // mapping without a float round trip.
    for frame in 0..frames {
        let t = frame as f64 / frame_rate;
        compositor.render(t, layers, assets, overrides);
        recorder.write_frame(compositor.surface())?;
    }

    recorder.finish()
}

/// Decode the soundtrack, trim or zero-pad it to the composition duration,
/// and stage it as a raw f32le temp file for the recorder's second input.
fn stage_audio(
    assets: &AssetCache,
    rel_path: &str,
    duration_sec: f64,
) -> LunpoResult<tempfile::NamedTempFile> {
    let full = assets.root().join(rel_path);
    let mut pcm = decode_audio_f32le(&full, AUDIO_SAMPLE_RATE, AUDIO_CHANNELS)?;

    let bytes_per_sample = usize::from(AUDIO_CHANNELS) * 4;
    let wanted_samples = (duration_sec * f64::from(AUDIO_SAMPLE_RATE)).round().max(0.0) as usize;
    let wanted_bytes = wanted_samples * bytes_per_sample;
    pcm.resize(wanted_bytes, 0);

    let mut file = tempfile::NamedTempFile::new()
        .map_err(|e| LunpoError::audio_decode(format!("failed to create audio temp file: {e}")))?;
    file.write_all(&pcm)
        .map_err(|e| LunpoError::audio_decode(format!("failed to stage audio samples: {e}")))?;
    file.flush()
        .map_err(|e| LunpoError::audio_decode(format!("failed to flush staged audio: {e}")))?;
    Ok(file)
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
