//! Lunpo is a playback and export engine for keyframe animation documents.
//!
//! A document (exported from an After Effects-style authoring tool as JSON)
//! describes one composition: a stack of image and looping-video layers with
//! animated transforms, opacity, blend modes, chroma keying and time
//! remapping. Lunpo consumes that document and produces two things over one
//! shared rendering path:
//!
//! 1. **Preview**: [`Player::tick`] quantizes elapsed wall time onto the
//!    composition's frame grid, loops seamlessly, and renders into a CPU
//!    [`Surface`].
//! 2. **Export**: [`Player::export`] walks every frame of the grid exactly
//!    once, streams the pixels to the system `ffmpeg` binary and muxes the
//!    soundtrack in, producing a deterministic, frame-accurate artifact.
//!
//! One layer of the document is the substitutable *character* slot: the host
//! supplies its image plus transform and color knobs through
//! [`CharacterOverride`], and the engine normalizes arbitrary artwork into
//! the slot the document authored.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic rendering**: a frame is a pure function of the
//!   document, the override snapshot and the frame time.
//! - **Premultiplied RGBA8** end-to-end: chroma keying runs on straight
//!   color at load, everything after is premultiplied.
//! - **Frame-level failures never fail the frame**: a missing asset or an
//!   unready video degrades to layer omission.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod compose;
mod document;
mod encode;
mod export;
mod foundation;
mod overrides;
mod player;
mod schedule;

pub use assets::cache::{AssetCache, PreparedAsset, PreparedImage, load_image};
pub use assets::video::{VideoHandle, VideoInfo};
pub use compose::blend::{BlendMode, blend_pixel, parse_blend_mode};
pub use compose::color::ColorFilter;
pub use compose::compositor::{FrameCompositor, Surface};
pub use compose::draw::{blit_surface, draw_image};
pub use compose::transform::{CharacterFit, LayerTransform, resolve_transform};
pub use document::model::{
    AnimationDocument, Composition, EffectDesc, EffectProperty, EffectValue, Layer, ScalarOrVec,
    SourceDesc, TransformGroup,
};
pub use document::prepare::{
    AssetId, CacheKey, ChromaKey, PreparedLayer, RenderKind, chroma_key_settings,
    is_character_layer, prepare_layers,
};
pub use document::property::{
    Blend, DimProperty, EaseHandle, InterpMode, Keyframe, Property, PropertyComponent,
    SeparatedProperty,
};
pub use encode::ffmpeg::{
    AudioInput, EncoderChoice, FfmpegRecorder, RecorderConfig, decode_audio_f32le, select_encoder,
};
pub use export::pipeline::{AUDIO_CLIP, ExportOptions};
pub use foundation::error::{LunpoError, LunpoResult};
pub use overrides::{CharacterOverride, ColorAdjust, OverrideTransform, normalize_asset_path};
pub use player::Player;
pub use schedule::{clamped_frame_time, looped_frame_time, total_frames};
