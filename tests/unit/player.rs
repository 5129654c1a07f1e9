use super::*;
use std::time::Duration;

use crate::{AnimationDocument, ExportOptions};

fn empty_doc() -> AnimationDocument {
    AnimationDocument::from_json(
        br#"{"comp": {"width": 4, "height": 4, "duration": 1.0, "frameRate": 30.0, "layers": []}}"#,
    )
    .unwrap()
}

#[test]
fn first_tick_anchors_the_clock_at_frame_zero() {
    let dir = tempfile::tempdir().unwrap();
    let mut player = Player::new(empty_doc(), dir.path());
    let now = Instant::now();
    assert_eq!(player.tick(now), 0.0);
}

#[test]
fn ticks_quantize_onto_the_frame_grid_and_loop() {
    let dir = tempfile::tempdir().unwrap();
    let mut player = Player::new(empty_doc(), dir.path());
    let start = Instant::now();
    player.tick(start);

    // 40ms at 30 fps is inside frame 1.
    let t = player.tick(start + Duration::from_millis(40));
    assert!((t - 1.0 / 30.0).abs() < 1e-9);

    // 1.5s wraps: frame 45 mod 30 = frame 15.
    let t = player.tick(start + Duration::from_millis(1500));
    assert!((t - 15.0 / 30.0).abs() < 1e-9);
}

#[test]
fn restart_reanchors_on_the_next_tick() {
    let dir = tempfile::tempdir().unwrap();
    let mut player = Player::new(empty_doc(), dir.path());
    let start = Instant::now();
    player.tick(start);
    player.tick(start + Duration::from_millis(500));

    player.restart();
    let later = start + Duration::from_secs(10);
    assert_eq!(player.tick(later), 0.0);
}

#[test]
fn export_is_a_noop_while_another_export_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut player = Player::new(empty_doc(), dir.path());
    player.exporting_flag().store(true, Ordering::SeqCst);
    assert!(player.is_exporting());

    let options = ExportOptions {
        out_dir: dir.path().to_path_buf(),
        audio_path: None,
    };
    let result = player.export(&options).unwrap();
    assert!(result.is_none());
    assert!(dir.path().read_dir().unwrap().next().is_none());
}

#[test]
fn changing_the_override_image_reprepares_layers() {
    let doc = AnimationDocument::from_json(
        br#"{"comp": {"width": 4, "height": 4, "duration": 1.0, "frameRate": 30.0, "layers": [
            {"index": 1, "name": "RefuteCutIn_A", "inPoint": 0.0, "outPoint": 1.0}
        ]}}"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut player = Player::new(doc, dir.path());
    assert!(player.overrides().image_path.is_empty());

    let mut overrides = CharacterOverride::default();
    overrides.image_path = "chars/alice.png".to_string();
    player.set_overrides(overrides);
    assert_eq!(player.overrides().image_path, "chars/alice.png");

    // Knob-only updates keep the prepared set untouched.
    let mut knobs = player.overrides().clone();
    knobs.transform.rotation = 45.0;
    player.set_overrides(knobs);
    assert_eq!(player.overrides().transform.rotation, 45.0);
}

#[test]
fn swapping_the_character_image_leaves_other_layers_pixel_identical() {
    fn write_png(path: &std::path::Path, px: [u8; 4]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::from_raw(1, 1, px.to_vec())
            .unwrap()
            .save(path)
            .unwrap();
    }
    fn pixel(data: &[u8], x: usize, y: usize) -> [u8; 4] {
        let o = (y * 4 + x) * 4;
        [data[o], data[o + 1], data[o + 2], data[o + 3]]
    }

    let root = tempfile::tempdir().unwrap();
    write_png(&root.path().join("lunpo/assets-bg/bg.png"), [0, 0, 255, 255]);
    write_png(&root.path().join("chars/a.png"), [255, 0, 0, 255]);
    write_png(&root.path().join("chars/b.png"), [0, 255, 0, 255]);

    let doc = AnimationDocument::from_json(
        br#"{"comp": {"width": 4, "height": 4, "duration": 1.0, "frameRate": 30.0, "layers": [
            {"index": 1, "name": "RefuteCutIn_A", "inPoint": 0.0, "outPoint": 1.0,
             "source": {"name": "slot", "type": "Footage", "path": "x", "width": 1, "height": 1},
             "transform": {"position": {"static": [2.0, 2.0]}}},
            {"index": 2, "name": "backdrop", "inPoint": 0.0, "outPoint": 1.0,
             "source": {"name": "bg.png", "type": "Footage", "path": "c\\assets-bg\\bg.png"},
             "transform": {"scale": {"static": [400.0, 400.0]}}}
        ]}}"#,
    )
    .unwrap();

    let mut overrides = CharacterOverride::default();
    overrides.image_path = "chars/a.png".to_string();
    let mut player = Player::with_overrides(doc, root.path(), overrides);

    player.render_at(0.0);
    let before = player.surface().data().to_vec();

    let mut swapped = player.overrides().clone();
    swapped.image_path = "chars/b.png".to_string();
    player.set_overrides(swapped);
    player.render_at(0.0);
    let after = player.surface().data();

    // The 1x1 character sits centered on (2, 2), covering pixels with x and
    // y in 1..=2. Everything else must be byte-identical across the swap.
    let mut character_changed = false;
    for y in 0..4 {
        for x in 0..4 {
            let inside = (1..=2).contains(&x) && (1..=2).contains(&y);
            let (b, a) = (pixel(&before, x, y), pixel(after, x, y));
            if inside {
                character_changed |= a != b;
            } else {
                assert_eq!(a, b, "non-character pixel ({x}, {y}) changed");
            }
        }
    }
    assert!(character_changed, "character footprint should repaint");
    assert_eq!(pixel(after, 2, 2)[1], 255, "swapped image should show");
}

#[test]
fn ticks_do_not_render_while_exporting() {
    let dir = tempfile::tempdir().unwrap();
    let mut player = Player::new(empty_doc(), dir.path());
    player.exporting_flag().store(true, Ordering::SeqCst);
    // Still advances the clock without touching the surface.
    let t = player.tick(Instant::now());
    assert!(t >= 0.0);
}
