use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::foundation::error::{CanvasError, CanvasResult};
use crate::render::frame_cache::FrameCache;
use crate::scene::graph::{NodeId, SceneGraph};
use crate::scene::subtree::Subtree;

/// Which content root a cache's switch hangs under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RendererKind {
    /// Ordinary data rendering.
    #[default]
    Default,
    /// Interactive geometry edited in place.
    DirectManipulation,
}

/// Failure reported by a [`SceneTransform`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The input cannot be mapped to geometry.
    #[error("structural: {0}")]
    Structural(String),
    /// Building the geometry ran out of memory or another bounded resource.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),
    /// The build was cancelled before finishing.
    #[error("interrupted")]
    Interrupted,
}

/// Upstream step turning a data value into scene geometry.
pub trait SceneTransform: Send + 'static {
    /// Data handed to [`RenderCache::set_data`].
    type Input: Send + 'static;

    fn transform(&mut self, input: &Self::Input) -> Result<Subtree, TransformError>;

    /// Release whatever caches the transform holds. Called before retrying after
    /// [`TransformError::ResourceExhaustion`].
    fn reclaim(&mut self) {}
}

/// Result of [`RenderCache::rebuild_if_needed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Nothing to do, or the cache is infeasible.
    Skipped,
    /// Slot 0 holds freshly built content.
    Rebuilt,
    /// Slot 0 was emptied; see [`RenderCache::errors`] unless the build was interrupted.
    Failed,
}

const CONTENT: usize = 0;
const EMPTY: usize = 1;

/// Rebuild state for one data source.
pub struct RenderCache<T: SceneTransform> {
    kind: RendererKind,
    transform: T,
    pending: Option<T::Input>,
    input: Option<T::Input>,
    feasible: bool,
    data_changed: bool,
    control_changed: bool,
    errors: Vec<CanvasError>,
    suppress_errors: bool,
    enabled: bool,
    switch: NodeId,
    scene: Arc<RwLock<SceneGraph>>,
    canvas: FrameCache,
    retry_delay: Duration,
}

impl<T: SceneTransform> RenderCache<T> {
    /// Link a fresh two-slot switch under the root for `kind`.
    pub fn new(
        kind: RendererKind,
        transform: T,
        canvas: FrameCache,
        retry_delay: Duration,
    ) -> CanvasResult<Self> {
        let scene = Arc::clone(canvas.scene());
        let switch = {
            let mut g = scene.write();
            let id = g.insert(Subtree::switch(
                vec![Subtree::empty_group(), Subtree::empty_group()],
                Some(CONTENT),
            ))?;
            let root = match kind {
                RendererKind::Default => g.non_direct_root(),
                RendererKind::DirectManipulation => g.direct_root(),
            };
            g.add_child(root, id)?;
            id
        };
        Ok(Self {
            kind,
            transform,
            pending: None,
            input: None,
            feasible: true,
            data_changed: false,
            control_changed: false,
            errors: Vec::new(),
            suppress_errors: false,
            enabled: true,
            switch,
            scene,
            canvas,
            retry_delay,
        })
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    /// The cache's switch node.
    pub fn switch(&self) -> NodeId {
        self.switch
    }

    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn transform_mut(&mut self) -> &mut T {
        &mut self.transform
    }

    /// Queue new input for the next rebuild and mark the cache feasible again.
    pub fn set_data(&mut self, input: T::Input) {
        self.pending = Some(input);
        self.data_changed = true;
        self.feasible = true;
    }

    /// Request a rebuild from the current input.
    pub fn mark_control_changed(&mut self) {
        self.control_changed = true;
    }

    /// Errors of the last rebuild attempt; empty while suppressed.
    pub fn errors(&self) -> &[CanvasError] {
        if self.suppress_errors {
            &[]
        } else {
            &self.errors
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn suppress_errors(&mut self, suppress: bool) {
        self.suppress_errors = suppress;
    }

    /// The built content group, when slot 0 is non-empty.
    pub fn branch(&self) -> Option<NodeId> {
        let g = self.scene.read();
        let slot = *g.children(self.switch).ok()?.get(CONTENT)?;
        let non_empty = g.children(slot).map(|c| !c.is_empty()).unwrap_or(false);
        non_empty.then_some(slot)
    }

    /// Show slot 0 (`true`) or the empty slot, keeping the built content either way.
    pub fn toggle(&mut self, enabled: bool) -> CanvasResult<()> {
        let slot = if enabled { CONTENT } else { EMPTY };
        self.scene.write().set_selected(self.switch, Some(slot))?;
        self.enabled = enabled;
        self.canvas.scratch_images();
        Ok(())
    }

    /// Rebuild slot 0 when input or controls changed since the last attempt.
    pub fn rebuild_if_needed(&mut self) -> RebuildOutcome {
        if !self.feasible || !(self.data_changed || self.control_changed) {
            self.pending = None;
            return RebuildOutcome::Skipped;
        }
        self.data_changed = false;
        self.control_changed = false;
        self.errors.clear();
        if let Some(input) = self.pending.take() {
            self.input = Some(input);
        }
        let Some(input) = self.input.as_ref() else {
            return RebuildOutcome::Skipped;
        };

        let first = self.transform.transform(input);
        let built = match first {
            Err(TransformError::ResourceExhaustion(msg)) => {
                tracing::debug!(%msg, "transform exhausted resources; retrying once");
                self.empty_content();
                self.transform.reclaim();
                std::thread::sleep(self.retry_delay);
                match self.input.as_ref() {
                    Some(input) => self
                        .transform
                        .transform(input)
                        .map_err(|e| {
                            TransformError::Structural(format!("retry after exhaustion: {e}"))
                        }),
                    None => Err(TransformError::Interrupted),
                }
            }
            other => other,
        };

        match built {
            Ok(subtree) => match self.link(subtree) {
                Ok(()) => {
                    tracing::debug!(kind = ?self.kind, "rebuilt content");
                    RebuildOutcome::Rebuilt
                }
                Err(e) => self.fail(e),
            },
            Err(TransformError::Interrupted) => {
                tracing::debug!(kind = ?self.kind, "transform interrupted");
                self.empty_content();
                RebuildOutcome::Failed
            }
            Err(TransformError::Structural(msg) | TransformError::ResourceExhaustion(msg)) => {
                self.fail(CanvasError::structural(msg))
            }
        }
    }

    fn link(&mut self, subtree: Subtree) -> CanvasResult<()> {
        let subtree = if subtree.is_group() {
            subtree
        } else {
            Subtree::group(vec![subtree])
        };
        {
            let mut g = self.scene.write();
            let id = g.insert(subtree)?;
            if let Err(e) = g.replace_child_at(self.switch, CONTENT, id) {
                let _ = g.release(id);
                return Err(e);
            }
        }
        self.canvas.scratch_images();
        Ok(())
    }

    fn fail(&mut self, err: CanvasError) -> RebuildOutcome {
        tracing::warn!(kind = ?self.kind, error = %err, "rebuild failed");
        self.errors.push(err);
        self.empty_content();
        self.feasible = false;
        RebuildOutcome::Failed
    }

    fn empty_content(&mut self) {
        let replaced = {
            let mut g = self.scene.write();
            g.insert(Subtree::empty_group())
                .and_then(|id| g.replace_child_at(self.switch, CONTENT, id))
        };
        match replaced {
            Ok(()) => self.canvas.scratch_images(),
            Err(e) => tracing::error!(error = %e, "could not empty cache content"),
        }
    }

    /// Unlink and free the switch with everything under it.
    pub fn release(&mut self) -> CanvasResult<()> {
        self.scene.write().release(self.switch)?;
        self.canvas.scratch_images();
        Ok(())
    }
}

/// Type-erased view of a [`RenderCache`] held by the display.
pub(crate) trait Renderer: Send {
    fn kind(&self) -> RendererKind;
    fn rebuild_if_needed(&mut self) -> RebuildOutcome;
    fn mark_control_changed(&mut self);
    fn toggle(&mut self, enabled: bool) -> CanvasResult<()>;
    fn errors(&self) -> &[CanvasError];
    fn release(&mut self) -> CanvasResult<()>;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: SceneTransform> Renderer for RenderCache<T> {
    fn kind(&self) -> RendererKind {
        self.kind
    }

    fn rebuild_if_needed(&mut self) -> RebuildOutcome {
        RenderCache::rebuild_if_needed(self)
    }

    fn mark_control_changed(&mut self) {
        RenderCache::mark_control_changed(self);
    }

    fn toggle(&mut self, enabled: bool) -> CanvasResult<()> {
        RenderCache::toggle(self, enabled)
    }

    fn errors(&self) -> &[CanvasError] {
        RenderCache::errors(self)
    }

    fn release(&mut self) -> CanvasResult<()> {
        RenderCache::release(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/render_cache.rs"]
mod tests;
