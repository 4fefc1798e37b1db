use super::*;

#[test]
fn viewport_rejects_empty_dimensions() {
    assert!(Viewport::new(0, 10).is_err());
    assert!(Viewport::new(10, 0).is_err());
    assert_eq!(Viewport::new(3, 2).unwrap().pixel_count(), 6);
}

#[test]
fn transform_centers_and_scales_by_shorter_side() {
    let vp = Viewport::new(200, 100).unwrap();
    let t = vp.transform(Affine::IDENTITY, false);
    let origin = t * Point::ORIGIN;
    assert_eq!(origin, Point::new(100.0, 50.0));

    let unit = t * Point::new(1.0, 1.0);
    assert!((unit.x - (100.0 + 33.0)).abs() < 1e-9);
    assert!((unit.y - (50.0 + 33.0)).abs() < 1e-9);
}

#[test]
fn auto_aspect_stretches_the_longer_axis() {
    let vp = Viewport::new(200, 100).unwrap();
    assert_eq!(vp.aspect(), (2.0, 1.0));
    let t = vp.transform(Affine::IDENTITY, true);
    let p = t * Point::new(1.0, 1.0);
    assert!((p.x - (100.0 + 66.0)).abs() < 1e-9);
    assert!((p.y - (50.0 + 33.0)).abs() < 1e-9);
}

#[test]
fn unit_rgb_clamps_and_rounds() {
    assert_eq!(Rgba8::from_unit_rgb(2.0, -1.0, 0.5), Rgba8::opaque(255, 0, 128));
    assert_eq!(Rgba8::from_unit_rgb(f32::NAN, 1.0, 0.0), Rgba8::opaque(0, 255, 0));
}
