use crate::foundation::error::{CanvasError, CanvasResult};
use crate::scene::geometry::Appearance;

/// Animation binding of a Switch: which child is live for each animation step.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwitchAnimation {
    /// Own sample values, one per child. When set, the child nearest to the animation's
    /// current sample value is selected instead of the child at the step index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f64>>,
}

/// Owned, detached scene fragment.
///
/// Transforms produce a `Subtree`; [`crate::SceneGraph::insert`] links it into the arena.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subtree {
    /// Ordered children.
    Group {
        /// Children in insertion order.
        #[serde(default)]
        children: Vec<Subtree>,
    },
    /// Children of which at most one is traversed.
    Switch {
        /// Children in insertion order.
        #[serde(default)]
        children: Vec<Subtree>,
        /// Selected position, if any.
        #[serde(default)]
        selected: Option<usize>,
        /// Marks the switch as driven by the animation state.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        animation: Option<SwitchAnimation>,
    },
    /// Drawable leaf.
    Appearance(Appearance),
}

impl Subtree {
    pub fn empty_group() -> Self {
        Self::Group {
            children: Vec::new(),
        }
    }

    pub fn group(children: Vec<Subtree>) -> Self {
        Self::Group { children }
    }

    pub fn switch(children: Vec<Subtree>, selected: Option<usize>) -> Self {
        Self::Switch {
            children,
            selected,
            animation: None,
        }
    }

    /// Switch whose selection follows the animation step.
    pub fn animation_switch(children: Vec<Subtree>, samples: Option<Vec<f64>>) -> Self {
        Self::Switch {
            children,
            selected: None,
            animation: Some(SwitchAnimation { samples }),
        }
    }

    pub fn leaf(appearance: Appearance) -> Self {
        Self::Appearance(appearance)
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }

    /// Number of nodes in this fragment.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Group { children } | Self::Switch { children, .. } => {
                1 + children.iter().map(Self::node_count).sum::<usize>()
            }
            Self::Appearance(_) => 1,
        }
    }

    /// Check switch selections and animation samples before anything is linked.
    pub fn validate(&self) -> CanvasResult<()> {
        match self {
            Self::Group { children } => children.iter().try_for_each(Self::validate),
            Self::Switch {
                children,
                selected,
                animation,
            } => {
                if let Some(i) = selected
                    && *i >= children.len()
                {
                    return Err(CanvasError::invariant(format!(
                        "switch selects child {i} of {}",
                        children.len()
                    )));
                }
                if let Some(SwitchAnimation {
                    samples: Some(samples),
                }) = animation
                {
                    if samples.len() != children.len() {
                        return Err(CanvasError::invariant(format!(
                            "animation switch has {} samples for {} children",
                            samples.len(),
                            children.len()
                        )));
                    }
                    if samples.iter().any(|s| !s.is_finite()) {
                        return Err(CanvasError::invariant(
                            "animation switch samples must be finite",
                        ));
                    }
                }
                children.iter().try_for_each(Self::validate)
            }
            Self::Appearance(_) => Ok(()),
        }
    }

    pub fn from_json_str(s: &str) -> CanvasResult<Self> {
        let t: Self = serde_json::from_str(s)
            .map_err(|e| CanvasError::invalid_argument(format!("parse subtree JSON: {e}")))?;
        t.validate()?;
        Ok(t)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/subtree.rs"]
mod tests;
