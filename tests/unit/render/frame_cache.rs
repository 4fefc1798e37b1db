use super::*;
use crate::foundation::core::Point;
use crate::scene::geometry::{Appearance, GeometryArray, GeometryKind};
use crate::scene::subtree::Subtree;

const RED: Rgba8 = Rgba8::opaque(255, 0, 0);
const BLUE: Rgba8 = Rgba8::opaque(0, 0, 255);

fn unit_quad(color: Rgba8) -> Subtree {
    let g = GeometryArray::builder(
        GeometryKind::Quad,
        vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
    )
    .build()
    .unwrap();
    Subtree::leaf(Appearance::new(g).with_color(color))
}

fn cache_with(content: Subtree) -> FrameCache {
    let cfg = CanvasConfig {
        width: 64,
        height: 64,
        ..CanvasConfig::default()
    };
    cache_with_config(cfg, content)
}

fn cache_with_config(cfg: CanvasConfig, content: Subtree) -> FrameCache {
    let mut graph = SceneGraph::new();
    let id = graph.insert(content).unwrap();
    let root = graph.non_direct_root();
    graph.add_child(root, id).unwrap();
    let animation = AnimationState::new(&cfg);
    FrameCache::new(&cfg, Arc::new(RwLock::new(graph)), animation).unwrap()
}

#[test]
fn sized_to_at_least_one_step() {
    let c = cache_with(Subtree::empty_group());
    assert_eq!(c.len(), 1);
    assert_eq!(c.valid_flags(), vec![false]);
    assert!(c.image(0).is_none());
}

#[test]
fn second_render_reuses_cached_raster() {
    let c = cache_with(unit_quad(RED));
    let first = c.render(0).unwrap();
    assert_eq!(first.pixel(32, 32), Some(RED));
    assert_eq!(first.pixel(0, 0), Some(Rgba8::BLACK));
    assert!(c.is_valid(0));

    let second = c.render(0).unwrap();
    assert_eq!(first.data, second.data);
    assert_eq!(
        c.stats(),
        FrameCacheStats {
            paints: 2,
            redraws: 1,
            timeouts: 0
        }
    );
}

#[test]
fn scratch_forces_redraw() {
    let c = cache_with(unit_quad(RED));
    c.render(0).unwrap();
    c.scratch_images();
    assert!(!c.is_valid(0));
    c.render(0).unwrap();
    assert_eq!(c.stats().redraws, 2);
}

#[test]
fn missing_step_is_a_timeout() {
    let c = cache_with(unit_quad(RED));
    let err = c.render(3).unwrap_err();
    assert!(err.is_transient());
    assert_eq!(c.stats().timeouts, 1);
    assert_eq!(c.stats().paints, 0);
}

#[test]
fn viewport_changes_reallocate() {
    let c = cache_with(unit_quad(RED));
    c.render(0).unwrap();
    c.set_viewport(0, 10);
    assert_eq!(c.viewport(), Viewport::new(64, 64).unwrap());
    assert!(c.is_valid(0));

    c.set_viewport(32, 16);
    assert!(!c.is_valid(0));
    let r = c.render(0).unwrap();
    assert_eq!((r.width, r.height), (32, 16));

    c.create_images(Some(3));
    assert_eq!(c.len(), 3);
    assert_eq!(c.valid_flags(), vec![false; 3]);
}

#[test]
fn attribute_changes_invalidate() {
    let c = cache_with(Subtree::empty_group());
    c.render(0).unwrap();
    c.set_background(BLUE);
    assert!(!c.is_valid(0));
    assert_eq!(c.render(0).unwrap().pixel(1, 1), Some(BLUE));

    c.render(0).unwrap();
    c.set_clip(Rect::new(0.5, 0.5, 0.5, 2.0));
    assert!(c.is_valid(0));
    assert_eq!(c.clip(), None);
    c.set_clip(Rect::new(0.0, 0.0, 0.5, 0.5));
    assert!(!c.is_valid(0));
    c.render(0).unwrap();
    c.unset_clip();
    assert!(!c.is_valid(0));
}

#[test]
fn clip_limits_content() {
    let c = cache_with(unit_quad(RED));
    c.set_clip(Rect::new(0.0, 0.0, 1.0, 1.0));
    let r = c.render(0).unwrap();
    // world +x is pixel +x; the left half is clipped away
    assert_eq!(r.pixel(40, 40), Some(RED));
    assert_eq!(r.pixel(20, 20), Some(Rgba8::BLACK));
}

#[test]
fn overlay_is_composited_but_not_cached() {
    let c = cache_with(Subtree::empty_group());
    c.set_overlay(Overlay {
        cursor: Some(Point::ZERO),
        ..Overlay::default()
    });
    let shown = c.render(0).unwrap();
    assert_eq!(shown.pixel(32, 5), Some(Rgba8::WHITE));
    let cached = c.image(0).unwrap();
    assert_eq!(cached.pixel(32, 5), Some(Rgba8::BLACK));
}

#[test]
fn animation_switch_follows_step() {
    let c = cache_with(Subtree::animation_switch(
        vec![unit_quad(RED), unit_quad(BLUE)],
        None,
    ));
    c.animation().set_samples(vec![0.0, 1.0]).unwrap();
    c.create_images(Some(2));
    assert_eq!(c.render(0).unwrap().pixel(32, 32), Some(RED));
    assert_eq!(c.render(1).unwrap().pixel(32, 32), Some(BLUE));
    assert_eq!(c.valid_flags(), vec![true, true]);

    c.scratch_images();
    assert_eq!(c.render(1).unwrap().pixel(32, 32), Some(BLUE));
    assert_eq!(c.valid_flags(), vec![false, true]);
}

#[test]
fn render_loop_presents_and_stops() {
    let c = cache_with(unit_quad(RED));
    let done = c.distributor().frame_done();
    c.start().unwrap();
    assert!(c.is_running());
    let ev = done.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(ev.step, 0);
    c.stop();
    assert!(!c.is_running());
    assert!(c.distributor().latest().is_some());
}

#[test]
fn idle_render_loop_presents_once() {
    let cfg = CanvasConfig {
        width: 16,
        height: 16,
        render_idle_timeout_ms: 20,
        ..CanvasConfig::default()
    };
    let c = cache_with_config(cfg, unit_quad(RED));
    let done = c.distributor().frame_done();
    c.start().unwrap();
    let first = done.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(first.redrawn);
    // several idle timeouts pass without a wakeup
    std::thread::sleep(Duration::from_millis(300));
    assert!(done.try_recv().is_err());
    assert_eq!(c.stats().paints, 1);

    c.scratch_images();
    let again = done.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(again.redrawn);
    c.stop();
}
