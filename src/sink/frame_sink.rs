use crate::foundation::error::CanvasResult;
use crate::render::raster::Raster;

/// Configuration provided to a [`FrameSink`] before its first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Width of the first frame in pixels.
    pub width: u32,
    /// Height of the first frame in pixels.
    pub height: u32,
}

/// Consumer of presented frames.
///
/// Ordering contract: `push_frame` is called in presentation order. Steps may repeat or go
/// backwards when the animation does.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CanvasResult<()>;
    /// Push one presented frame for animation step `step`.
    fn push_frame(&mut self, step: usize, frame: &Raster) -> CanvasResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> CanvasResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(usize, Raster)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(usize, Raster)] {
        &self.frames
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CanvasResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, step: usize, frame: &Raster) -> CanvasResult<()> {
        self.frames.push((step, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> CanvasResult<()> {
        self.ended = true;
        Ok(())
    }
}
