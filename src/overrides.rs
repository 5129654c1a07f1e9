//! Read-only collaborator state supplied by the host application.
//!
//! The engine reads these plain values but does not own or edit them; the
//! host (picker UI, sliders) writes them and hands a snapshot to
//! [`crate::prepare_layers`] / the compositor.

use serde::{Deserialize, Serialize};

/// User-controlled transform knobs composed onto the character layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverrideTransform {
    /// Horizontal position offset in pixels.
    pub offset_x: f64,
    /// Vertical position offset in pixels.
    pub offset_y: f64,
    /// Scale multiplier in percent (100 = unchanged).
    pub scale: f64,
    /// Extra rotation in degrees.
    pub rotation: f64,
    /// Mirror horizontally.
    pub flip_x: bool,
    /// Mirror vertically.
    pub flip_y: bool,
}

impl Default for OverrideTransform {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 100.0,
            rotation: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

/// Color-adjust knobs applied to non-character layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorAdjust {
    /// Hue rotation in degrees.
    pub hue: f64,
    /// Saturation in percent (100 = unchanged).
    pub saturation: f64,
    /// Brightness in percent (100 = unchanged).
    pub brightness: f64,
    /// Contrast in percent (100 = unchanged).
    pub contrast: f64,
}

impl Default for ColorAdjust {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 100.0,
            brightness: 100.0,
            contrast: 100.0,
        }
    }
}

impl ColorAdjust {
    /// Whether the adjustment is a no-op and the filter path can be skipped.
    pub fn is_neutral(&self) -> bool {
        self.hue == 0.0
            && self.saturation == 100.0
            && self.brightness == 100.0
            && self.contrast == 100.0
    }
}

/// Snapshot of all host-owned override state the engine consumes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CharacterOverride {
    /// Substitution image path for the character layer, relative to the
    /// asset root.
    pub image_path: String,
    /// Transform knobs.
    pub transform: OverrideTransform,
    /// Color-adjust knobs.
    pub color_adjust: ColorAdjust,
}

/// Normalize a host-supplied asset path: `/` separators, no leading slash,
/// no empty, `.` or parent-traversal segments.
pub fn normalize_asset_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect::<Vec<_>>()
        .join("/")
}
