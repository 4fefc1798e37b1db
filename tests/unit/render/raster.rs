use super::*;

fn vp(w: u32, h: u32) -> Viewport {
    Viewport::new(w, h).unwrap()
}

#[test]
fn new_raster_is_filled_and_opaque() {
    let r = Raster::new(vp(3, 2), Rgba8 { r: 1, g: 2, b: 3, a: 0 });
    assert_eq!(r.data.len(), 3 * 2 * 4);
    assert_eq!(r.pixel(2, 1), Some(Rgba8::opaque(1, 2, 3)));
    assert_eq!(r.pixel(3, 0), None);
}

#[test]
fn blend_mixes_with_destination() {
    let mut r = Raster::new(vp(2, 1), Rgba8::BLACK);
    r.blend(0, 0, Rgba8::opaque(200, 100, 0), 0.5);
    assert_eq!(r.pixel(0, 0), Some(Rgba8::opaque(100, 50, 0)));
    r.blend(1, 0, Rgba8::WHITE, 1.0);
    assert_eq!(r.pixel(1, 0), Some(Rgba8::WHITE));
    // outside the raster is a no-op
    r.blend(-1, 0, Rgba8::WHITE, 1.0);
    r.blend(0, 5, Rgba8::WHITE, 1.0);
}

#[test]
fn png_round_trips_through_disk() {
    let mut r = Raster::new(vp(4, 4), Rgba8::opaque(9, 8, 7));
    r.blend(1, 2, Rgba8::opaque(255, 0, 0), 1.0);
    let path = std::env::temp_dir().join(format!("scenecanvas_raster_{}.png", std::process::id()));
    r.save_png(&path).unwrap();
    let back = image::open(&path).unwrap().to_rgba8();
    let _ = std::fs::remove_file(&path);
    assert_eq!(back, r.to_image().unwrap());
}
