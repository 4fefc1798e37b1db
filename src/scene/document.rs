use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::config::CanvasConfig;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::scene::subtree::Subtree;

/// Self-contained scene description: display config, animation axis and static content.
///
/// This is the JSON input of the `scenecanvas frames` command.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDocument {
    #[serde(default)]
    pub config: CanvasConfig,
    /// Animation sample values, one per step. Empty means a single still frame.
    #[serde(default)]
    pub samples: Vec<f64>,
    /// Optional per-step dwell times; shorter lists repeat their last entry.
    #[serde(default)]
    pub dwell_ms: Option<Vec<u64>>,
    /// Camera affine coefficients `[a, b, c, d, e, f]`.
    #[serde(default)]
    pub camera: Option<[f64; 6]>,
    /// Clip rectangle `[x0, y0, x1, y1]` in world units.
    #[serde(default)]
    pub clip: Option<[f64; 4]>,
    /// Content placed under the non-direct root.
    pub content: Subtree,
}

impl SceneDocument {
    pub fn from_json_str(s: &str) -> CanvasResult<Self> {
        let doc: Self = serde_json::from_str(s)
            .map_err(|e| CanvasError::invalid_argument(format!("parse scene JSON: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CanvasError::invalid_argument(format!("open scene '{}': {e}", path.display()))
        })?;
        let doc: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            CanvasError::invalid_argument(format!("parse scene '{}': {e}", path.display()))
        })?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> CanvasResult<()> {
        self.config.validate()?;
        self.content.validate()
    }

    pub fn camera(&self) -> Affine {
        self.camera.map(Affine::new).unwrap_or(Affine::IDENTITY)
    }

    pub fn clip(&self) -> Option<Rect> {
        self.clip.map(|[x0, y0, x1, y1]| Rect::new(x0, y0, x1, y1))
    }

    /// Number of frames the document animates through.
    pub fn step_count(&self) -> usize {
        self.samples.len().max(1)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/document.rs"]
mod tests;
