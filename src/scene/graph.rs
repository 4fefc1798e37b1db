use crate::foundation::error::{CanvasError, CanvasResult};
use crate::scene::geometry::Appearance;
use crate::scene::subtree::{Subtree, SwitchAnimation};

/// Generation-checked handle to a node in a [`SceneGraph`].
///
/// Handles go stale when their node is released; using a stale handle is an
/// [`CanvasError::InvariantViolation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Ordered children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    children: Vec<NodeId>,
}

impl Group {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Group that traverses only its selected child.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Switch {
    children: Vec<NodeId>,
    selected: Option<usize>,
    animation: Option<SwitchAnimation>,
}

impl Switch {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The child traversal follows, if any.
    pub fn selected_child(&self) -> Option<NodeId> {
        self.selected.and_then(|i| self.children.get(i).copied())
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }
}

/// Arena node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Group(Group),
    Switch(Switch),
    Appearance(Appearance),
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Group(g) => &g.children,
            Self::Switch(s) => &s.children,
            Self::Appearance(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Self::Group(g) => Some(&mut g.children),
            Self::Switch(s) => Some(&mut s.children),
            Self::Appearance(_) => None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    parent: Option<NodeId>,
    node: Option<Node>,
}

/// Arena of scene nodes with a fixed root layout.
///
/// The root Group holds two content roots: the non-direct root for ordinary renderers and the
/// direct root for direct-manipulation renderers. A clip rectangle applies only beneath them.
/// Every node has at most one parent; parents are plain handles, never owners.
#[derive(Debug)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    root: NodeId,
    non_direct: NodeId,
    direct: NodeId,
    animation_switches: Vec<NodeId>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut g = Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            root: NodeId {
                index: 0,
                generation: 0,
            },
            non_direct: NodeId {
                index: 0,
                generation: 0,
            },
            direct: NodeId {
                index: 0,
                generation: 0,
            },
            animation_switches: Vec::new(),
        };
        let non_direct = g.alloc(Node::Group(Group::default()));
        let direct = g.alloc(Node::Group(Group::default()));
        let root = g.alloc(Node::Group(Group {
            children: vec![non_direct, direct],
        }));
        g.slots[non_direct.index as usize].parent = Some(root);
        g.slots[direct.index as usize].parent = Some(root);
        g.root = root;
        g.non_direct = non_direct;
        g.direct = direct;
        g
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Content root for default renderers.
    pub fn non_direct_root(&self) -> NodeId {
        self.non_direct
    }

    /// Content root for direct-manipulation renderers.
    pub fn direct_root(&self) -> NodeId {
        self.direct
    }

    /// Number of live nodes, fixed roots included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    pub fn node(&self, id: NodeId) -> CanvasResult<&Node> {
        self.slot(id).and_then(|s| {
            s.node
                .as_ref()
                .ok_or_else(|| CanvasError::invariant(format!("node {id:?} is released")))
        })
    }

    pub fn parent(&self, id: NodeId) -> CanvasResult<Option<NodeId>> {
        Ok(self.slot(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> CanvasResult<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    /// Handles of every live animation switch, in registration order.
    pub fn animation_switches(&self) -> &[NodeId] {
        &self.animation_switches
    }

    /// Link an owned fragment into the arena as a detached subtree and return its top handle.
    pub fn insert(&mut self, subtree: Subtree) -> CanvasResult<NodeId> {
        subtree.validate()?;
        Ok(self.insert_unchecked(subtree, None))
    }

    fn insert_unchecked(&mut self, subtree: Subtree, parent: Option<NodeId>) -> NodeId {
        match subtree {
            Subtree::Appearance(a) => {
                let id = self.alloc(Node::Appearance(a));
                self.slots[id.index as usize].parent = parent;
                id
            }
            Subtree::Group { children } => {
                let id = self.alloc(Node::Group(Group::default()));
                self.slots[id.index as usize].parent = parent;
                let kids = children
                    .into_iter()
                    .map(|c| self.insert_unchecked(c, Some(id)))
                    .collect();
                if let Some(Node::Group(g)) = self.slots[id.index as usize].node.as_mut() {
                    g.children = kids;
                }
                id
            }
            Subtree::Switch {
                children,
                selected,
                animation,
            } => {
                let animated = animation.is_some();
                let id = self.alloc(Node::Switch(Switch {
                    children: Vec::new(),
                    selected,
                    animation,
                }));
                self.slots[id.index as usize].parent = parent;
                let kids = children
                    .into_iter()
                    .map(|c| self.insert_unchecked(c, Some(id)))
                    .collect();
                if let Some(Node::Switch(s)) = self.slots[id.index as usize].node.as_mut() {
                    s.children = kids;
                }
                if animated {
                    self.animation_switches.push(id);
                }
                id
            }
        }
    }

    /// Append a detached node to `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> CanvasResult<()> {
        self.check_attachable(parent, child)?;
        self.children_mut(parent)?.push(child);
        self.slots[child.index as usize].parent = Some(parent);
        Ok(())
    }

    /// Remove and release the child at `index`.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> CanvasResult<()> {
        let removed = {
            let children = self.children_mut(parent)?;
            if index >= children.len() {
                return Err(CanvasError::invalid_argument(format!(
                    "remove child {index} of {}",
                    children.len()
                )));
            }
            children.remove(index)
        };
        if let Some(Node::Switch(s)) = self.slots[parent.index as usize].node.as_mut() {
            s.selected = match s.selected {
                Some(i) if i == index => None,
                Some(i) if i > index => Some(i - 1),
                other => other,
            };
        }
        self.slots[removed.index as usize].parent = None;
        self.free_subtree(removed);
        Ok(())
    }

    /// Replace the child at `index` with a detached node, releasing the old child.
    pub fn replace_child_at(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> CanvasResult<()> {
        self.check_attachable(parent, child)?;
        let old = {
            let children = self.children_mut(parent)?;
            let Some(slot) = children.get_mut(index) else {
                return Err(CanvasError::invalid_argument(format!(
                    "replace child {index} of {}",
                    children.len()
                )));
            };
            std::mem::replace(slot, child)
        };
        self.slots[child.index as usize].parent = Some(parent);
        self.slots[old.index as usize].parent = None;
        self.free_subtree(old);
        Ok(())
    }

    /// Select the child a Switch traverses.
    ///
    /// # Panics
    ///
    /// Panics if `selected` is past the end of the children; that is a caller bug.
    pub fn set_selected(&mut self, switch: NodeId, selected: Option<usize>) -> CanvasResult<()> {
        let node = self.node_mut(switch)?;
        let Node::Switch(s) = node else {
            return Err(CanvasError::invariant(format!("node {switch:?} is not a switch")));
        };
        if let Some(i) = selected {
            assert!(
                i < s.children.len(),
                "switch selection {i} out of range for {} children",
                s.children.len()
            );
        }
        s.selected = selected;
        Ok(())
    }

    /// Detach `id` from its parent (if any) and free it with its whole subtree.
    pub fn release(&mut self, id: NodeId) -> CanvasResult<()> {
        if id == self.root || id == self.direct || id == self.non_direct {
            return Err(CanvasError::invalid_argument("fixed roots cannot be released"));
        }
        if let Some(parent) = self.slot(id)?.parent {
            let pos = self
                .node(parent)?
                .children()
                .iter()
                .position(|&c| c == id)
                .ok_or_else(|| {
                    CanvasError::invariant(format!("{id:?} missing from parent {parent:?}"))
                })?;
            return self.remove_child_at(parent, pos);
        }
        self.free_subtree(id);
        Ok(())
    }

    /// Point every animation switch at the child for `step`.
    ///
    /// Switches with their own samples select the child nearest to `value`; the rest select
    /// `step` directly. Out-of-range steps select nothing.
    pub fn select_animation_step(&mut self, step: usize, value: Option<f64>) {
        for i in 0..self.animation_switches.len() {
            let id = self.animation_switches[i];
            let Some(Some(Node::Switch(s))) = self
                .slots
                .get_mut(id.index as usize)
                .map(|slot| slot.node.as_mut())
            else {
                continue;
            };
            let own = s.animation.as_ref().and_then(|a| a.samples.as_deref());
            s.selected = match (own, value) {
                (Some(samples), Some(v)) => nearest_index(samples, v),
                (Some(_), None) => None,
                (None, _) => (step < s.children.len()).then_some(step),
            };
        }
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> CanvasResult<()> {
        if self.slot(child)?.parent.is_some() || child == self.root {
            return Err(CanvasError::invariant(format!(
                "node {child:?} already has a parent"
            )));
        }
        let mut cursor = Some(parent);
        while let Some(p) = cursor {
            if p == child {
                return Err(CanvasError::invariant(format!(
                    "attaching {child:?} under {parent:?} would form a cycle"
                )));
            }
            cursor = self.slot(p)?.parent;
        }
        Ok(())
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            slot.parent = None;
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            parent: None,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn free_subtree(&mut self, top: NodeId) {
        let mut stack = vec![top];
        let mut freed_switch = false;
        while let Some(id) = stack.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                freed_switch |= matches!(&node, Node::Switch(s) if s.is_animated());
                stack.extend_from_slice(node.children());
                self.live -= 1;
            }
            slot.parent = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
        if freed_switch {
            let slots = &self.slots;
            self.animation_switches.retain(|id| {
                slots
                    .get(id.index as usize)
                    .is_some_and(|s| s.generation == id.generation && s.node.is_some())
            });
        }
    }

    fn slot(&self, id: NodeId) -> CanvasResult<&Slot> {
        match self.slots.get(id.index as usize) {
            Some(s) if s.generation == id.generation && s.node.is_some() => Ok(s),
            _ => Err(CanvasError::invariant(format!("stale node handle {id:?}"))),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> CanvasResult<&mut Node> {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot {
                generation,
                node: Some(node),
                ..
            }) if *generation == id.generation => Ok(node),
            _ => Err(CanvasError::invariant(format!("stale node handle {id:?}"))),
        }
    }

    fn children_mut(&mut self, id: NodeId) -> CanvasResult<&mut Vec<NodeId>> {
        self.node_mut(id)?
            .children_mut()
            .ok_or_else(|| CanvasError::invariant(format!("node {id:?} is a leaf")))
    }
}

/// Index of the sample nearest to `value`; ties go to the earlier sample.
pub(crate) fn nearest_index(samples: &[f64], value: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in samples.iter().enumerate() {
        let d = (s - value).abs();
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/graph.rs"]
mod tests;
