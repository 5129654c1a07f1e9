use super::*;
use std::path::Path;

use crate::{AnimationDocument, AssetCache, CharacterOverride, prepare_layers};

fn write_png(path: &Path, px: [u8; 4]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbaImage::from_raw(1, 1, px.to_vec())
        .unwrap()
        .save(path)
        .unwrap();
}

fn doc(layers_json: &str) -> AnimationDocument {
    let json = format!(
        r#"{{"comp": {{"width": 2, "height": 2, "duration": 1.0, "frameRate": 30.0, "layers": {layers_json}}}}}"#
    );
    AnimationDocument::from_json(json.as_bytes()).unwrap()
}

fn image_layer_json(index: i64, name: &str) -> String {
    format!(
        r#"{{"index": {index}, "name": "{name}", "inPoint": 0.0, "outPoint": 1.0,
            "source": {{"name": "{name}.png", "type": "Footage", "path": "x\\assets-t\\{name}.png"}}}}"#
    )
}

fn pixel(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
    let o = (y as usize * surface.width() as usize + x as usize) * 4;
    let d = surface.data();
    [d[o], d[o + 1], d[o + 2], d[o + 3]]
}

#[test]
fn lower_indices_paint_on_top() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("lunpo/assets-t/red.png"), [255, 0, 0, 255]);
    write_png(&dir.path().join("lunpo/assets-t/blue.png"), [0, 0, 255, 255]);

    // Both 1x1 opaque images draw at the origin; index 1 must win.
    let doc = doc(&format!(
        "[{}, {}]",
        image_layer_json(1, "red"),
        image_layer_json(2, "blue")
    ));
    let prepared = prepare_layers(&doc, "");
    let mut assets = AssetCache::new(dir.path());
    assets.sync(&prepared);

    let mut compositor = FrameCompositor::new(2, 2, 30.0);
    compositor.render(0.5, &prepared, &mut assets, &CharacterOverride::default());
    assert_eq!(pixel(compositor.surface(), 0, 0), [255, 0, 0, 255]);
}

#[test]
fn layers_outside_their_window_do_not_draw() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("lunpo/assets-t/red.png"), [255, 0, 0, 255]);

    let layer = r#"[{"index": 1, "name": "red", "inPoint": 0.0, "outPoint": 0.2,
            "source": {"name": "red.png", "type": "Footage", "path": "x\\assets-t\\red.png"}}]"#;
    let doc = doc(layer);
    let prepared = prepare_layers(&doc, "");
    let mut assets = AssetCache::new(dir.path());
    assets.sync(&prepared);

    let mut compositor = FrameCompositor::new(2, 2, 30.0);
    compositor.render(0.5, &prepared, &mut assets, &CharacterOverride::default());
    assert!(compositor.surface().data().iter().all(|&b| b == 0));

    compositor.render(0.1, &prepared, &mut assets, &CharacterOverride::default());
    assert_eq!(pixel(compositor.surface(), 0, 0), [255, 0, 0, 255]);
}

#[test]
fn missing_assets_degrade_to_layer_omission() {
    let dir = tempfile::tempdir().unwrap();

    let doc = doc(&format!("[{}]", image_layer_json(1, "ghost")));
    let prepared = prepare_layers(&doc, "");
    let mut assets = AssetCache::new(dir.path());
    assets.sync(&prepared);

    let mut compositor = FrameCompositor::new(2, 2, 30.0);
    compositor.render(0.5, &prepared, &mut assets, &CharacterOverride::default());
    assert!(compositor.surface().data().iter().all(|&b| b == 0));
}

#[test]
fn layer_opacity_scales_the_contribution() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("lunpo/assets-t/red.png"), [255, 0, 0, 255]);

    let layer = r#"[{"index": 1, "name": "red", "inPoint": 0.0, "outPoint": 1.0,
            "source": {"name": "red.png", "type": "Footage", "path": "x\\assets-t\\red.png"},
            "transform": {"opacity": {"static": 50.0}}}]"#;
    let doc = doc(layer);
    let prepared = prepare_layers(&doc, "");
    let mut assets = AssetCache::new(dir.path());
    assets.sync(&prepared);

    let mut compositor = FrameCompositor::new(2, 2, 30.0);
    compositor.render(0.5, &prepared, &mut assets, &CharacterOverride::default());
    let px = pixel(compositor.surface(), 0, 0);
    assert!((i16::from(px[3]) - 128).abs() <= 2, "{px:?}");
}

#[test]
fn video_target_time_prefers_remap_and_pins_empty_tracks_to_zero() {
    let compositor = FrameCompositor::new(2, 2, 30.0);

    let natural: crate::Layer = serde_json::from_str(
        r#"{"index": 1, "name": "v", "startTime": 1.0, "stretch": 50.0}"#,
    )
    .unwrap();
    // (3.0 - 1.0) * 0.5 = 1.0 clip seconds.
    assert_eq!(compositor.video_target_time(&natural, 3.0, 10.0), 1.0);

    let remapped: crate::Layer = serde_json::from_str(
        r#"{"index": 1, "name": "v", "startTime": 1.0,
            "timeRemap": {"static": 0.5}}"#,
    )
    .unwrap();
    assert_eq!(compositor.video_target_time(&remapped, 3.0, 10.0), 0.5);

    // A remap track with no data pins the clip to 0 rather than falling
    // back to natural time.
    let empty_remap: crate::Layer =
        serde_json::from_str(r#"{"index": 1, "name": "v", "startTime": 1.0, "timeRemap": {}}"#)
            .unwrap();
    assert_eq!(compositor.video_target_time(&empty_remap, 3.0, 10.0), 0.0);
}

#[test]
fn video_target_time_clamps_and_quantizes() {
    let compositor = FrameCompositor::new(2, 2, 30.0);
    let layer: crate::Layer =
        serde_json::from_str(r#"{"index": 1, "name": "v", "timeRemap": {"static": 99.0}}"#).unwrap();
    // Clamped to the clip duration, then snapped to the frame grid.
    assert_eq!(compositor.video_target_time(&layer, 0.0, 2.0), 2.0);

    let mid: crate::Layer =
        serde_json::from_str(r#"{"index": 1, "name": "v", "timeRemap": {"static": 0.52}}"#).unwrap();
    assert_eq!(
        compositor.video_target_time(&mid, 0.0, 2.0),
        (0.52f64 * 30.0).round() / 30.0
    );
}

#[test]
fn render_is_deterministic_for_identical_inputs() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("lunpo/assets-t/red.png"), [200, 10, 30, 255]);

    let doc = doc(&format!("[{}]", image_layer_json(1, "red")));
    let prepared = prepare_layers(&doc, "");
    let mut assets = AssetCache::new(dir.path());
    assets.sync(&prepared);

    let mut compositor = FrameCompositor::new(2, 2, 30.0);
    compositor.render(0.5, &prepared, &mut assets, &CharacterOverride::default());
    let first = compositor.surface().data().to_vec();
    compositor.render(0.5, &prepared, &mut assets, &CharacterOverride::default());
    assert_eq!(first, compositor.surface().data());
}
