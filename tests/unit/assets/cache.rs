use super::*;
use crate::document::prepare::CacheKey;

fn write_png(path: &Path, pixels: &[[u8; 4]], width: u32, height: u32) {
    let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
    let img = image::RgbaImage::from_raw(width, height, raw).unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(path).unwrap();
}

fn image_layer(rel_path: &str) -> PreparedLayer {
    let layer: crate::Layer = serde_json::from_str(r#"{"index": 1, "name": "t"}"#).unwrap();
    PreparedLayer {
        layer,
        kind: RenderKind::Image,
        path: Some(rel_path.to_string()),
        key: Some(CacheKey::new(rel_path.to_string(), vec![])),
        is_character: false,
        chroma: None,
    }
}

#[test]
fn load_image_premultiplies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("half.png");
    write_png(&path, &[[200, 100, 0, 128]], 1, 1);

    let img = load_image(&path, None).unwrap();
    assert_eq!((img.width, img.height), (1, 1));
    let px = &img.rgba8_premul[..4];
    // 200 * 128/255 ~ 100, 100 * 128/255 ~ 50
    assert!((i16::from(px[0]) - 100).abs() <= 1, "{px:?}");
    assert!((i16::from(px[1]) - 50).abs() <= 1, "{px:?}");
    assert_eq!(px[3], 128);
}

#[test]
fn chroma_key_zeroes_matching_pixels_before_premultiply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyed.png");
    // One green pixel (keyed out) and one red pixel (kept).
    write_png(&path, &[[0, 255, 0, 255], [255, 0, 0, 255]], 2, 1);

    let key = ChromaKey {
        color: [0, 255, 0],
        tolerance: 10.0,
    };
    let img = load_image(&path, Some(key)).unwrap();
    assert_eq!(&img.rgba8_premul[..4], &[0, 0, 0, 0]);
    assert_eq!(&img.rgba8_premul[4..8], &[255, 0, 0, 255]);
}

#[test]
fn sync_loads_wanted_assets_and_evicts_stale_ones() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("a.png"), &[[1, 2, 3, 255]], 1, 1);
    write_png(&dir.path().join("b.png"), &[[4, 5, 6, 255]], 1, 1);

    let mut cache = AssetCache::new(dir.path());
    let a = image_layer("a.png");
    let b = image_layer("b.png");
    cache.sync(std::slice::from_ref(&a));
    assert_eq!(cache.len(), 1);
    assert!(cache.is_ready(a.asset_id().unwrap()));

    cache.sync(&[a.clone(), b.clone()]);
    assert_eq!(cache.len(), 2);

    cache.sync(std::slice::from_ref(&b));
    assert_eq!(cache.len(), 1);
    assert!(!cache.is_ready(a.asset_id().unwrap()));
    assert!(cache.is_ready(b.asset_id().unwrap()));
}

#[test]
fn one_bad_asset_does_not_block_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("good.png"), &[[1, 2, 3, 255]], 1, 1);

    let good = image_layer("good.png");
    let missing = image_layer("missing.png");
    let mut cache = AssetCache::new(dir.path());
    cache.sync(&[missing.clone(), good.clone()]);

    assert!(cache.is_ready(good.asset_id().unwrap()));
    assert!(!cache.is_ready(missing.asset_id().unwrap()));
}

#[test]
fn premultiply_scales_color_by_alpha_in_place() {
    // Straight-alpha input as both decoders produce it.
    let mut px = [200, 100, 0, 128, 50, 50, 50, 0, 10, 20, 30, 255];
    premultiply_in_place(&mut px);
    assert!((i16::from(px[0]) - 100).abs() <= 1);
    assert!((i16::from(px[1]) - 50).abs() <= 1);
    assert_eq!(px[3], 128);
    // Fully transparent collapses to zero, fully opaque is untouched.
    assert_eq!(&px[4..8], &[0, 0, 0, 0]);
    assert_eq!(&px[8..12], &[10, 20, 30, 255]);
}

#[test]
fn sync_is_idempotent_for_loaded_assets() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("a.png"), &[[9, 9, 9, 255]], 1, 1);
    let a = image_layer("a.png");
    let mut cache = AssetCache::new(dir.path());
    cache.sync(std::slice::from_ref(&a));
    cache.sync(std::slice::from_ref(&a));
    assert_eq!(cache.len(), 1);
}
