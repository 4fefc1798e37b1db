use super::*;
use crate::foundation::core::{Rgba8, Viewport};
use crate::sink::frame_sink::InMemorySink;

fn frame(v: u8) -> Arc<Raster> {
    Arc::new(Raster::new(
        Viewport::new(2, 2).unwrap(),
        Rgba8::opaque(v, v, v),
    ))
}

#[test]
fn latest_tracks_last_present() {
    let d = FrameDistributor::new(2);
    assert!(d.latest().is_none());
    d.present(0, frame(1), true);
    d.present(3, frame(2), false);
    let last = d.latest().unwrap();
    assert_eq!(last.step, 3);
    assert_eq!(last.raster.pixel(0, 0), Some(Rgba8::opaque(2, 2, 2)));
}

#[test]
fn full_observer_queues_drop_frames() {
    let d = FrameDistributor::new(1);
    let rx = d.subscribe();
    assert!(d.has_pending());
    d.present(0, frame(1), true);
    d.present(1, frame(2), true);
    assert_eq!(rx.try_recv().unwrap().step, 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn disconnected_observers_are_pruned() {
    let d = FrameDistributor::new(1);
    drop(d.subscribe());
    d.present(0, frame(1), true);
    assert!(!d.has_pending());
}

#[test]
fn capture_is_one_shot() {
    let d = FrameDistributor::new(1);
    let cap = d.request_capture();
    assert!(d.has_pending());
    d.present(5, frame(9), true);
    assert!(!d.has_pending());
    d.present(6, frame(9), true);
    assert_eq!(cap.recv().unwrap().step, 5);
    assert!(cap.try_recv().is_err());
}

#[test]
fn frame_done_reports_redraws() {
    let d = FrameDistributor::new(1);
    let done = d.frame_done();
    d.present(1, frame(0), true);
    d.present(1, frame(0), false);
    assert_eq!(done.recv().unwrap(), FrameDone { step: 1, redrawn: true });
    assert_eq!(done.recv().unwrap(), FrameDone { step: 1, redrawn: false });
}

#[test]
fn attached_sink_receives_frames_in_order() {
    let d = FrameDistributor::new(8);
    let pump = d.attach_sink(InMemorySink::new()).unwrap();
    d.present(0, frame(1), true);
    d.present(1, frame(2), true);
    let sink = pump.finish().unwrap();
    assert_eq!(sink.config(), Some(SinkConfig { width: 2, height: 2 }));
    let steps: Vec<usize> = sink.frames().iter().map(|(s, _)| *s).collect();
    assert_eq!(steps, vec![0, 1]);
    assert!(sink.is_ended());
}

#[test]
fn undrained_frame_done_is_bounded() {
    let d = FrameDistributor::new(1);
    let done = d.frame_done();
    for step in 0..(DONE_QUEUE_DEPTH + 10) {
        d.present(step, frame(0), false);
    }
    assert_eq!(done.try_iter().count(), DONE_QUEUE_DEPTH);
    d.present(0, frame(0), true);
    assert_eq!(done.try_recv().unwrap(), FrameDone { step: 0, redrawn: true });
}
