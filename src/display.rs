use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::animation::state::AnimationState;
use crate::cache::render_cache::{
    RebuildOutcome, RenderCache, Renderer, RendererKind, SceneTransform,
};
use crate::foundation::config::CanvasConfig;
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::render::frame_cache::FrameCache;
use crate::render::raster::Raster;
use crate::scene::graph::SceneGraph;
use crate::sink::distributor::FrameDistributor;

/// Handle of a renderer registered with a [`Display`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RendererId(u64);

/// Owner of one scene, its animation axis, its frame cache and the renderers feeding it.
///
/// Loops run only between [`Display::start`] and [`Display::shutdown`]; dropping the display
/// shuts it down.
pub struct Display {
    config: CanvasConfig,
    animation: AnimationState,
    canvas: FrameCache,
    renderers: BTreeMap<RendererId, Box<dyn Renderer>>,
    next_id: u64,
    seen_samples: u64,
}

impl Display {
    pub fn new(config: CanvasConfig) -> CanvasResult<Self> {
        config.validate()?;
        let animation = AnimationState::new(&config);
        let scene = Arc::new(RwLock::new(SceneGraph::new()));
        let canvas = FrameCache::new(&config, scene, animation.clone())?;
        Ok(Self {
            config,
            animation,
            canvas,
            renderers: BTreeMap::new(),
            next_id: 1,
            seen_samples: 0,
        })
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Start the stepping and render loops.
    pub fn start(&self) -> CanvasResult<()> {
        self.animation.start()?;
        self.canvas.start()
    }

    /// Stop both loops and wait for them. Idempotent.
    pub fn shutdown(&self) {
        self.canvas.stop();
        self.animation.stop();
    }

    pub fn is_running(&self) -> bool {
        self.canvas.is_running() || self.animation.is_running()
    }

    /// Register a data source. Its switch is linked immediately and starts empty.
    pub fn add_renderer<T: SceneTransform>(
        &mut self,
        kind: RendererKind,
        transform: T,
    ) -> CanvasResult<RendererId> {
        let cache = RenderCache::new(
            kind,
            transform,
            self.canvas.clone(),
            self.config.exhaustion_retry_delay(),
        )?;
        let id = RendererId(self.next_id);
        self.next_id += 1;
        self.renderers.insert(id, Box::new(cache));
        tracing::debug!(?id, ?kind, "renderer added");
        Ok(id)
    }

    /// Unlink a renderer and free its geometry.
    pub fn remove_renderer(&mut self, id: RendererId) -> CanvasResult<()> {
        let mut r = self
            .renderers
            .remove(&id)
            .ok_or_else(|| unknown_renderer(id))?;
        tracing::debug!(?id, kind = ?r.kind(), "renderer removed");
        r.release()
    }

    pub fn renderer_ids(&self) -> Vec<RendererId> {
        self.renderers.keys().copied().collect()
    }

    /// Queue new input for renderer `id`, whose transform must be `T`.
    pub fn set_data<T: SceneTransform>(
        &mut self,
        id: RendererId,
        input: T::Input,
    ) -> CanvasResult<()> {
        let cache = self
            .renderer_mut(id)?
            .as_any_mut()
            .downcast_mut::<RenderCache<T>>()
            .ok_or_else(|| {
                CanvasError::invalid_argument(format!(
                    "renderer {id:?} is not driven by {}",
                    std::any::type_name::<T>()
                ))
            })?;
        cache.set_data(input);
        Ok(())
    }

    pub fn mark_control_changed(&mut self, id: RendererId) -> CanvasResult<()> {
        self.renderer_mut(id)?.mark_control_changed();
        Ok(())
    }

    pub fn toggle_renderer(&mut self, id: RendererId, enabled: bool) -> CanvasResult<()> {
        self.renderer_mut(id)?.toggle(enabled)
    }

    /// Pick up sample-set changes, then rebuild every renderer that needs it.
    #[tracing::instrument(skip(self))]
    pub fn do_action(&mut self) -> Vec<(RendererId, RebuildOutcome)> {
        self.sync_animation_samples();
        self.renderers
            .iter_mut()
            .map(|(&id, r)| (id, r.rebuild_if_needed()))
            .collect()
    }

    /// Errors recorded by the last rebuild of renderer `id`.
    pub fn errors(&self, id: RendererId) -> CanvasResult<&[CanvasError]> {
        self.renderers
            .get(&id)
            .map(|r| r.errors())
            .ok_or_else(|| unknown_renderer(id))
    }

    /// Synchronously produce the presented raster for `step`.
    pub fn render(&self, step: usize) -> CanvasResult<Arc<Raster>> {
        self.canvas.render(step)
    }

    pub fn sink(&self) -> &FrameDistributor {
        self.canvas.distributor()
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn canvas(&self) -> &FrameCache {
        &self.canvas
    }

    /// Replace the animation sample set and resize the frame cache to match.
    pub fn set_animation_samples(&mut self, samples: Vec<f64>) -> CanvasResult<()> {
        self.animation.set_samples(samples)?;
        self.sync_animation_samples();
        Ok(())
    }

    fn sync_animation_samples(&mut self) {
        let version = self.animation.samples_version();
        if version == self.seen_samples {
            return;
        }
        self.seen_samples = version;
        let n = self.animation.step_count().max(1);
        if n != self.canvas.len() {
            self.canvas.create_images(Some(n));
        } else {
            // same count, new values: animation switches may select differently
            self.canvas.scratch_images();
        }
    }

    fn renderer_mut(&mut self, id: RendererId) -> CanvasResult<&mut Box<dyn Renderer>> {
        self.renderers
            .get_mut(&id)
            .ok_or_else(|| unknown_renderer(id))
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn unknown_renderer(id: RendererId) -> CanvasError {
    CanvasError::invalid_argument(format!("unknown renderer {id:?}"))
}
