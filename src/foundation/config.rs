use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::foundation::core::{Rgba8, Viewport};
use crate::foundation::error::{CanvasError, CanvasResult};

/// Boundary behavior of [`crate::AnimationState::take_step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// Stop at the first/last step.
    #[default]
    Clamp,
    /// Continue cyclically past either end.
    Wrap,
}

/// Order in which Group children are visited by the rasterizer.
///
/// Later-visited siblings paint over earlier ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildOrder {
    /// Last inserted child first.
    #[default]
    Reverse,
    /// First inserted child first.
    Forward,
}

/// Display configuration. Every field has a default, so `{}` is a valid JSON config.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Initial viewport width in pixels.
    pub width: u32,
    /// Initial viewport height in pixels.
    pub height: u32,
    /// Clear color for every redraw.
    pub background_rgb: [u8; 3],
    /// Dwell time assigned to new animation steps.
    pub default_dwell_ms: u64,
    /// Upper bound on how long the render loop sleeps without a wake signal.
    pub render_idle_timeout_ms: u64,
    /// First retry delay after a paint could not produce a raster.
    pub timeout_backoff_min_ms: u64,
    /// Cap of the retry delay after repeated timeouts.
    pub timeout_backoff_max_ms: u64,
    /// Pause before retrying a transform that ran out of resources.
    pub exhaustion_retry_delay_ms: u64,
    /// Boundary behavior for animation stepping.
    pub step_policy: StepPolicy,
    /// Sibling traversal order.
    pub child_order: ChildOrder,
    /// Stretch the unit box to the viewport aspect ratio.
    pub auto_aspect: bool,
    /// Frames buffered per passive observer before new frames are dropped.
    pub observer_queue_depth: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            background_rgb: [0, 0, 0],
            default_dwell_ms: 500,
            render_idle_timeout_ms: 1000,
            timeout_backoff_min_ms: 50,
            timeout_backoff_max_ms: 1000,
            exhaustion_retry_delay_ms: 250,
            step_policy: StepPolicy::Clamp,
            child_order: ChildOrder::Reverse,
            auto_aspect: false,
            observer_queue_depth: 2,
        }
    }
}

impl CanvasConfig {
    /// Parse a config from JSON text and validate it.
    pub fn from_json_str(s: &str) -> CanvasResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| CanvasError::invalid_argument(format!("parse canvas config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CanvasError::invalid_argument(format!("open canvas config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            CanvasError::invalid_argument(format!("parse canvas config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CanvasResult<()> {
        Viewport::new(self.width, self.height)?;
        if self.default_dwell_ms == 0 {
            return Err(CanvasError::invalid_argument(
                "default_dwell_ms must be > 0",
            ));
        }
        if self.render_idle_timeout_ms == 0 {
            return Err(CanvasError::invalid_argument(
                "render_idle_timeout_ms must be > 0",
            ));
        }
        if self.timeout_backoff_min_ms == 0
            || self.timeout_backoff_min_ms > self.timeout_backoff_max_ms
        {
            return Err(CanvasError::invalid_argument(
                "timeout backoff requires 0 < min <= max",
            ));
        }
        if self.observer_queue_depth == 0 {
            return Err(CanvasError::invalid_argument(
                "observer_queue_depth must be > 0",
            ));
        }
        Ok(())
    }

    pub fn viewport(&self) -> CanvasResult<Viewport> {
        Viewport::new(self.width, self.height)
    }

    pub fn background(&self) -> Rgba8 {
        let [r, g, b] = self.background_rgb;
        Rgba8::opaque(r, g, b)
    }

    pub(crate) fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.render_idle_timeout_ms)
    }

    pub(crate) fn backoff_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.timeout_backoff_min_ms),
            Duration::from_millis(self.timeout_backoff_max_ms),
        )
    }

    pub(crate) fn exhaustion_retry_delay(&self) -> Duration {
        Duration::from_millis(self.exhaustion_retry_delay_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
