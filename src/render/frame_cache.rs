use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};

use crate::animation::state::AnimationState;
use crate::foundation::config::CanvasConfig;
use crate::foundation::core::{Affine, Rect, Rgba8, Viewport};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::foundation::signal::Signal;
use crate::render::overlay::Overlay;
use crate::render::raster::Raster;
use crate::render::rasterizer::{self, DrawParams};
use crate::scene::graph::SceneGraph;
use crate::sink::distributor::FrameDistributor;

/// Counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCacheStats {
    /// Completed paints, fast path included.
    pub paints: u64,
    /// Paints that drew the scene.
    pub redraws: u64,
    /// Paints that found no raster to produce.
    pub timeouts: u64,
}

/// One presented frame.
#[derive(Clone, Debug)]
pub(crate) struct Painted {
    pub(crate) step: usize,
    pub(crate) raster: Arc<Raster>,
    pub(crate) redrawn: bool,
}

struct Slots {
    viewport: Viewport,
    images: Vec<Option<Arc<Raster>>>,
    valid: Vec<bool>,
    /// Bumped on every reallocation; a redraw started under an older generation is discarded.
    generation: u64,
    camera: Affine,
    auto_aspect: bool,
    background: Rgba8,
    clip: Option<Rect>,
    overlay: Overlay,
}

impl Slots {
    fn reallocate(&mut self, n: usize) {
        let n = n.max(1);
        self.images = vec![None; n];
        self.valid = vec![false; n];
        self.generation += 1;
    }

    fn invalidate(&mut self) {
        self.valid.iter_mut().for_each(|v| *v = false);
    }
}

struct Shared {
    config: CanvasConfig,
    scene: Arc<RwLock<SceneGraph>>,
    animation: AnimationState,
    slots: Mutex<Slots>,
    render_lock: Mutex<()>,
    wake: Arc<Signal>,
    distributor: FrameDistributor,
    paints: AtomicU64,
    redraws: AtomicU64,
    timeouts: AtomicU64,
    loop_id: Mutex<Option<u64>>,
    next_loop_id: AtomicU64,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Per-animation-step raster cache with its render loop.
///
/// `images` and `valid` always have the same length `N = max(1, step_count)`. Geometry,
/// projection and attribute changes invalidate entries; viewport or `N` changes reallocate
/// them. Paints are serialized, and the slot lock is never held while drawing.
#[derive(Clone)]
pub struct FrameCache {
    shared: Arc<Shared>,
}

impl FrameCache {
    /// Size the cache from the config viewport and the animation's step count.
    ///
    /// The render loop wakes on the animation's redraw signal.
    pub fn new(
        config: &CanvasConfig,
        scene: Arc<RwLock<SceneGraph>>,
        animation: AnimationState,
    ) -> CanvasResult<Self> {
        config.validate()?;
        let n = animation.step_count().max(1);
        let wake = animation.redraw_signal();
        Ok(Self {
            shared: Arc::new(Shared {
                config: config.clone(),
                scene,
                slots: Mutex::new(Slots {
                    viewport: config.viewport()?,
                    images: vec![None; n],
                    valid: vec![false; n],
                    generation: 0,
                    camera: Affine::IDENTITY,
                    auto_aspect: config.auto_aspect,
                    background: config.background(),
                    clip: None,
                    overlay: Overlay::default(),
                }),
                animation,
                render_lock: Mutex::new(()),
                wake,
                distributor: FrameDistributor::new(config.observer_queue_depth),
                paints: AtomicU64::new(0),
                redraws: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
                loop_id: Mutex::new(None),
                next_loop_id: AtomicU64::new(1),
                handle: Mutex::new(None),
            }),
        })
    }

    pub fn scene(&self) -> &Arc<RwLock<SceneGraph>> {
        &self.shared.scene
    }

    pub fn animation(&self) -> &AnimationState {
        &self.shared.animation
    }

    pub fn distributor(&self) -> &FrameDistributor {
        &self.shared.distributor
    }

    /// Number of cached steps.
    pub fn len(&self) -> usize {
        self.shared.slots.lock().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn viewport(&self) -> Viewport {
        self.shared.slots.lock().viewport
    }

    pub fn is_valid(&self, step: usize) -> bool {
        self.shared
            .slots
            .lock()
            .valid
            .get(step)
            .copied()
            .unwrap_or(false)
    }

    pub fn valid_flags(&self) -> Vec<bool> {
        self.shared.slots.lock().valid.clone()
    }

    /// Cached raster of `step`, without overlay.
    pub fn image(&self, step: usize) -> Option<Arc<Raster>> {
        self.shared.slots.lock().images.get(step).cloned().flatten()
    }

    pub fn stats(&self) -> FrameCacheStats {
        FrameCacheStats {
            paints: self.shared.paints.load(Ordering::Relaxed),
            redraws: self.shared.redraws.load(Ordering::Relaxed),
            timeouts: self.shared.timeouts.load(Ordering::Relaxed),
        }
    }

    /// Reallocate `len` entries (or keep the current count) at the live viewport size.
    pub fn create_images(&self, len: Option<usize>) {
        let mut s = self.shared.slots.lock();
        let n = len.unwrap_or(s.images.len());
        s.reallocate(n);
        let (n, vp) = (s.images.len(), s.viewport);
        drop(s);
        tracing::debug!(steps = n, width = vp.width, height = vp.height, "frame cache reallocated");
        self.shared.wake.notify();
    }

    /// Invalidate every entry without reallocating.
    pub fn scratch_images(&self) {
        self.shared.slots.lock().invalidate();
        self.shared.wake.notify();
    }

    /// Resize the viewport. Ignored when either side is 0; reallocates on change.
    pub fn set_viewport(&self, width: u32, height: u32) {
        let Ok(vp) = Viewport::new(width, height) else {
            return;
        };
        let mut s = self.shared.slots.lock();
        if s.viewport == vp {
            return;
        }
        s.viewport = vp;
        drop(s);
        self.create_images(None);
    }

    pub fn background(&self) -> Rgba8 {
        self.shared.slots.lock().background
    }

    pub fn set_background(&self, color: Rgba8) {
        self.shared.slots.lock().background = color.with_alpha(255);
        self.scratch_images();
    }

    pub fn camera(&self) -> Affine {
        self.shared.slots.lock().camera
    }

    /// Replace the projection applied after the viewport transform's centering and scale.
    pub fn set_camera(&self, camera: Affine) {
        self.shared.slots.lock().camera = camera;
        self.scratch_images();
    }

    pub fn set_auto_aspect(&self, on: bool) {
        self.shared.slots.lock().auto_aspect = on;
        self.scratch_images();
    }

    pub fn clip(&self) -> Option<Rect> {
        self.shared.slots.lock().clip
    }

    /// Clip content-root drawing to `rect` in world units. Empty rectangles are ignored.
    pub fn set_clip(&self, rect: Rect) {
        let rect = rect.abs();
        if !(rect.width() > 0.0 && rect.height() > 0.0) {
            return;
        }
        self.shared.slots.lock().clip = Some(rect);
        self.scratch_images();
    }

    pub fn unset_clip(&self) {
        self.shared.slots.lock().clip = None;
        self.scratch_images();
    }

    /// Replace the overlay. Cached frames stay valid; the next paint re-presents.
    pub fn set_overlay(&self, overlay: Overlay) {
        self.shared.slots.lock().overlay = overlay;
        self.shared.wake.notify();
    }

    /// World-to-pixel transform of the next redraw.
    pub fn transform(&self) -> Affine {
        let s = self.shared.slots.lock();
        s.viewport.transform(s.camera, s.auto_aspect)
    }

    /// Synchronously produce the presented raster for `step`.
    ///
    /// Serialized with the render loop. Returns [`CanvasError::Timeout`] when `step` has no
    /// cache entry.
    pub fn render(&self, step: usize) -> CanvasResult<Arc<Raster>> {
        self.paint(Some(step)).map(|p| p.raster)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn paint(&self, requested: Option<usize>) -> CanvasResult<Painted> {
        let shared = &*self.shared;
        let _serial = shared.render_lock.lock();
        let _pause = shared.animation.suppress();
        let step = requested.unwrap_or_else(|| shared.animation.current());

        let (mut raster, generation, transform, clip, overlay) = {
            let mut s = shared.slots.lock();
            if step >= s.images.len() {
                shared.timeouts.fetch_add(1, Ordering::Relaxed);
                return Err(CanvasError::timeout(format!(
                    "no raster for step {step} of {}",
                    s.images.len()
                )));
            }
            let transform = s.viewport.transform(s.camera, s.auto_aspect);
            let overlay = s.overlay.is_active().then(|| s.overlay.clone());
            if s.valid[step]
                && let Some(img) = s.images[step].clone()
            {
                drop(s);
                return Ok(self.present(step, img, false, overlay, transform));
            }
            s.valid[step] = true;
            let (vp, bg) = (s.viewport, s.background);
            let mut raster = match s.images[step].take() {
                Some(img) if img.viewport() == vp => {
                    Arc::try_unwrap(img).unwrap_or_else(|_| Raster::new(vp, bg))
                }
                _ => Raster::new(vp, bg),
            };
            raster.clear(bg);
            (raster, s.generation, transform, s.clip, overlay)
        };

        let drawn = {
            let mut graph = shared.scene.write();
            shared.animation.select_switches(&mut graph, step);
            let graph = RwLockWriteGuard::downgrade(graph);
            rasterizer::draw_scene(
                &graph,
                &mut raster,
                &DrawParams {
                    transform,
                    clip,
                    child_order: shared.config.child_order,
                },
            )
        };

        let raster = Arc::new(raster);
        {
            let mut s = shared.slots.lock();
            if s.generation == generation {
                if drawn.is_err() {
                    s.valid[step] = false;
                } else {
                    s.images[step] = Some(Arc::clone(&raster));
                }
            }
        }
        drawn?;
        shared.redraws.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(step, "redrew step");
        Ok(self.present(step, raster, true, overlay, transform))
    }

    fn present(
        &self,
        step: usize,
        raster: Arc<Raster>,
        redrawn: bool,
        overlay: Option<Overlay>,
        transform: Affine,
    ) -> Painted {
        let shown = match overlay {
            Some(o) => {
                let mut copy = (*raster).clone();
                o.composite(&mut copy, transform);
                Arc::new(copy)
            }
            None => raster,
        };
        self.shared.paints.fetch_add(1, Ordering::Relaxed);
        self.shared
            .distributor
            .present(step, Arc::clone(&shown), redrawn);
        Painted {
            step,
            raster: shown,
            redrawn,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.loop_id.lock().is_some()
    }

    /// Spawn the render loop. A no-op when already running.
    pub fn start(&self) -> CanvasResult<()> {
        let mut id_slot = self.shared.loop_id.lock();
        if id_slot.is_some() {
            return Ok(());
        }
        let id = self.shared.next_loop_id.fetch_add(1, Ordering::Relaxed);
        let cache = self.clone();
        let handle = std::thread::Builder::new()
            .name("scenecanvas-render".to_owned())
            .spawn(move || render_loop(cache, id))
            .map_err(|e| CanvasError::Other(anyhow::anyhow!("spawn render loop: {e}")))?;
        *id_slot = Some(id);
        *self.shared.handle.lock() = Some(handle);
        Ok(())
    }

    /// Clear the loop identity, wake the loop and wait for it to exit.
    pub fn stop(&self) {
        let was_running = self.shared.loop_id.lock().take().is_some();
        self.shared.wake.notify();
        let handle = self.shared.handle.lock().take();
        if let Some(h) = handle
            && h.thread().id() != std::thread::current().id()
        {
            let _ = h.join();
        }
        if was_running {
            tracing::debug!("render loop stopped");
        }
    }

    fn is_current_loop(&self, id: u64) -> bool {
        *self.shared.loop_id.lock() == Some(id)
    }
}

fn render_loop(cache: FrameCache, id: u64) {
    tracing::debug!(loop_id = id, "render loop started");
    let idle = cache.shared.config.idle_timeout();
    let (min, max) = cache.shared.config.backoff_bounds();
    let mut backoff: Option<Duration> = None;
    // The first paint covers any request made before the loop started.
    cache.shared.wake.wait_timeout(Duration::ZERO);
    let mut due = true;
    while cache.is_current_loop(id) {
        if due {
            match cache.paint(None) {
                Ok(p) => {
                    tracing::trace!(step = p.step, redrawn = p.redrawn, "painted");
                    backoff = None;
                }
                Err(e) if e.is_transient() => {
                    let next = backoff.map_or(min, |b| (b * 2).min(max));
                    tracing::warn!(error = %e, retry_ms = next.as_millis() as u64, "paint timed out");
                    backoff = Some(next);
                }
                Err(e) => tracing::error!(error = %e, "paint failed"),
            }
        }
        // Idle timeouts only re-check the loop identity; a pending retry always repaints.
        due = match backoff {
            Some(retry) => {
                cache.shared.wake.wait_timeout(retry);
                true
            }
            None => cache.shared.wake.wait_timeout(idle),
        };
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame_cache.rs"]
mod tests;
