use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    document::property::{DimProperty, Property},
    foundation::error::{LunpoError, LunpoResult},
};

/// A serialized keyframe animation document exported from the authoring tool.
///
/// The document is a pure data model: loaded once at startup, immutable
/// afterwards, and reloaded wholesale if the source file changes. Field
/// access is defensive (optionals and defaults); there is no schema
/// validation beyond that.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnimationDocument {
    /// The single composition this document describes.
    pub comp: Composition,
}

/// Composition header plus its ordered layer stack.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Total duration in seconds.
    pub duration: f64,
    /// Output frame rate in frames per second.
    pub frame_rate: f64,
    /// Layers in declared order; `index` declares paint order.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// One layer of the composition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Declared stacking index; lower paints on top.
    pub index: i64,
    /// Layer name as authored.
    #[serde(default)]
    pub name: String,
    /// One edge of the visibility window in seconds.
    #[serde(default)]
    pub in_point: f64,
    /// The other edge of the visibility window (not necessarily ordered).
    #[serde(default)]
    pub out_point: f64,
    /// Layer start offset in composition seconds.
    #[serde(default)]
    pub start_time: f64,
    /// Time-scale factor in percent; negative plays in reverse.
    #[serde(default = "default_stretch")]
    pub stretch: f64,
    /// Blend mode identifier (e.g. "ADD", "SCREEN").
    #[serde(default)]
    pub blend_mode: String,
    /// Source footage descriptor; `None` for sourceless layers.
    #[serde(default)]
    pub source: Option<SourceDesc>,
    /// Animated transform property bag.
    #[serde(default)]
    pub transform: Option<TransformGroup>,
    /// Optional time-remap curve replacing the natural clip time.
    #[serde(default)]
    pub time_remap: Option<Property<f64>>,
    /// Attached effects.
    #[serde(default)]
    pub effects: Vec<EffectDesc>,
}

fn default_stretch() -> f64 {
    100.0
}

impl Layer {
    /// Whether the layer is visible at time `t`: the in/out points bound the
    /// window but may be stored in either order.
    pub fn visible_at(&self, t: f64) -> bool {
        let start = self.in_point.min(self.out_point);
        let end = self.in_point.max(self.out_point);
        (start..=end).contains(&t)
    }
}

/// Source footage metadata for a layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDesc {
    /// Footage item name (usually the file name).
    #[serde(default)]
    pub name: String,
    /// Footage kind, e.g. "Footage" or "Comp".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Original file path; `None` for solids/placeholders.
    #[serde(default)]
    pub path: Option<String>,
    /// Native pixel width, when known.
    #[serde(default)]
    pub width: Option<u32>,
    /// Native pixel height, when known.
    #[serde(default)]
    pub height: Option<u32>,
    /// Native duration in seconds, when known.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Animated transform property bag of a layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformGroup {
    /// Anchor point track.
    #[serde(default)]
    pub anchor_point: Option<DimProperty>,
    /// Position track (possibly separated per axis).
    #[serde(default)]
    pub position: Option<DimProperty>,
    /// Scale track in percent.
    #[serde(default)]
    pub scale: Option<DimProperty>,
    /// Opacity track, 0–100.
    #[serde(default)]
    pub opacity: Option<Property<f64>>,
    /// Rotation track in degrees.
    #[serde(default)]
    pub rotation: Option<Property<f64>>,
}

/// Effect attached to a layer, identified by its match name.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDesc {
    /// Stable effect identifier (e.g. "ADBE Color Key").
    #[serde(default)]
    pub match_name: String,
    /// Nested parameter tree.
    #[serde(default)]
    pub properties: Vec<EffectProperty>,
}

/// One node of an effect's nested parameter tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectProperty {
    /// Stable parameter identifier.
    #[serde(default)]
    pub match_name: String,
    /// Static parameter value, when the node carries one.
    #[serde(default)]
    pub value: Option<EffectValue>,
    /// Child parameter nodes.
    #[serde(default)]
    pub properties: Vec<EffectProperty>,
}

/// Static value slot of an effect parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectValue {
    /// Scalar or vector payload.
    #[serde(rename = "static", default)]
    pub static_value: Option<ScalarOrVec>,
}

/// A number or a list of numbers, as the exporter emits both.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrVec {
    /// Single number.
    Scalar(f64),
    /// Number list (e.g. an RGB(A) color).
    Vec(Vec<f64>),
}

impl AnimationDocument {
    /// Load and parse the document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> LunpoResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("read animation document '{}'", path.display()))
            .map_err(|e| LunpoError::document_load(format!("{e:#}")))?;
        Self::from_json(&bytes)
    }

    /// Parse the document from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> LunpoResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| LunpoError::document_load(format!("parse animation document: {e}")))
    }

    /// Composition frame rate with a 30 fps fallback for documents that
    /// omit or zero it.
    pub fn frame_rate(&self) -> f64 {
        if self.comp.frame_rate > 0.0 {
            self.comp.frame_rate
        } else {
            30.0
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/model.rs"]
mod tests;
