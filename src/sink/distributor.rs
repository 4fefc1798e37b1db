use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::foundation::error::{CanvasError, CanvasResult};
use crate::render::raster::Raster;
use crate::sink::frame_sink::{FrameSink, SinkConfig};

/// Buffered [`FrameDone`] events per receiver.
pub(crate) const DONE_QUEUE_DEPTH: usize = 64;

/// A presented frame.
#[derive(Clone, Debug)]
pub struct FrameMsg {
    /// Animation step the frame shows.
    pub step: usize,
    pub raster: Arc<Raster>,
}

/// Emitted once per completed paint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDone {
    pub step: usize,
    /// `false` when the cached raster was presented without drawing.
    pub redrawn: bool,
}

#[derive(Default)]
struct Outlets {
    observers: Vec<SyncSender<FrameMsg>>,
    captures: Vec<SyncSender<FrameMsg>>,
    done: Vec<SyncSender<FrameDone>>,
    latest: Option<FrameMsg>,
}

/// Best-effort fan-out of presented frames.
///
/// Sends never block: a full observer queue drops the frame, a disconnected receiver is pruned.
#[derive(Clone)]
pub struct FrameDistributor {
    outlets: Arc<Mutex<Outlets>>,
    depth: usize,
}

impl FrameDistributor {
    /// `depth` frames are buffered per observer.
    pub fn new(depth: usize) -> Self {
        Self {
            outlets: Arc::new(Mutex::new(Outlets::default())),
            depth: depth.max(1),
        }
    }

    /// Register a passive observer of every presented frame.
    pub fn subscribe(&self) -> Receiver<FrameMsg> {
        let (tx, rx) = mpsc::sync_channel(self.depth);
        self.outlets.lock().observers.push(tx);
        rx
    }

    /// Receive the next presented frame once.
    pub fn request_capture(&self) -> Receiver<FrameMsg> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.outlets.lock().captures.push(tx);
        rx
    }

    /// Receive a [`FrameDone`] event per paint. Events past a small undrained backlog are
    /// dropped.
    pub fn frame_done(&self) -> Receiver<FrameDone> {
        let (tx, rx) = mpsc::sync_channel(DONE_QUEUE_DEPTH);
        self.outlets.lock().done.push(tx);
        rx
    }

    /// Last presented frame (the visible surface).
    pub fn latest(&self) -> Option<FrameMsg> {
        self.outlets.lock().latest.clone()
    }

    /// Whether a present would copy the frame out to anyone.
    pub fn has_pending(&self) -> bool {
        let o = self.outlets.lock();
        !o.captures.is_empty() || !o.observers.is_empty()
    }

    /// Forward every presented frame to `sink` on a dedicated thread.
    pub fn attach_sink<S: FrameSink + 'static>(&self, sink: S) -> CanvasResult<SinkPump<S>> {
        let rx = self.subscribe();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("scenecanvas-sink".to_owned())
            .spawn(move || pump(sink, rx, &stop_flag))
            .map_err(|e| CanvasError::Other(anyhow::anyhow!("spawn sink pump: {e}")))?;
        Ok(SinkPump {
            stop,
            handle: Some(handle),
        })
    }

    pub(crate) fn present(&self, step: usize, raster: Arc<Raster>, redrawn: bool) {
        let msg = FrameMsg { step, raster };
        let mut o = self.outlets.lock();
        o.latest = Some(msg.clone());

        o.observers.retain(|tx| match tx.try_send(msg.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
        for tx in o.captures.drain(..) {
            let _ = tx.try_send(msg.clone());
        }
        o.done.retain(|tx| {
            !matches!(
                tx.try_send(FrameDone { step, redrawn }),
                Err(TrySendError::Disconnected(_))
            )
        });
    }
}

fn pump<S: FrameSink>(
    mut sink: S,
    rx: Receiver<FrameMsg>,
    stop: &AtomicBool,
) -> (S, CanvasResult<()>) {
    let res = drain(&mut sink, &rx, stop).and_then(|()| sink.end());
    (sink, res)
}

fn drain<S: FrameSink>(
    sink: &mut S,
    rx: &Receiver<FrameMsg>,
    stop: &AtomicBool,
) -> CanvasResult<()> {
    let mut started = false;
    let mut push = |sink: &mut S, msg: FrameMsg| -> CanvasResult<()> {
        if !started {
            sink.begin(SinkConfig {
                width: msg.raster.width,
                height: msg.raster.height,
            })?;
            started = true;
        }
        sink.push_frame(msg.step, &msg.raster)
    };
    loop {
        if stop.load(Ordering::Acquire) {
            while let Ok(msg) = rx.try_recv() {
                push(sink, msg)?;
            }
            return Ok(());
        }
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(msg) => push(sink, msg)?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

/// Handle of a sink attached with [`FrameDistributor::attach_sink`].
pub struct SinkPump<S: FrameSink + 'static> {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<(S, CanvasResult<()>)>>,
}

impl<S: FrameSink + 'static> SinkPump<S> {
    /// Flush queued frames, call `end` and hand the sink back.
    pub fn finish(mut self) -> CanvasResult<S> {
        self.stop.store(true, Ordering::Release);
        let handle = self
            .handle
            .take()
            .ok_or_else(|| CanvasError::invariant("sink pump already finished"))?;
        let (sink, res) = handle
            .join()
            .map_err(|_| CanvasError::Other(anyhow::anyhow!("sink pump panicked")))?;
        res?;
        Ok(sink)
    }
}

impl<S: FrameSink + 'static> Drop for SinkPump<S> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sink/distributor.rs"]
mod tests;
