//! The single active node.
//!
//! Selection holds an id, not the node, so it never keeps a deleted node
//! alive; lookups through a stale id simply resolve to nothing.

use crate::node::{NodeId, NodeKindTag, VisualNode};
use crate::{Scene, SheetError, SheetResult};

/// Tracks at most one selected node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionController {
    active: Option<NodeId>,
}

impl SelectionController {
    /// Nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a node. Selecting an id not in `scene` clears the selection.
    pub fn select(&mut self, scene: &Scene, id: NodeId) -> bool {
        if scene.contains(id) {
            self.active = Some(id);
            true
        } else {
            self.active = None;
            false
        }
    }

    /// Clear the selection.
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Selected id, if it still exists in `scene`.
    #[must_use]
    pub fn active_id(&self, scene: &Scene) -> Option<NodeId> {
        self.active.filter(|id| scene.contains(*id))
    }

    /// Whether `id` is the selected node.
    #[must_use]
    pub fn is_active(&self, id: NodeId) -> bool {
        self.active == Some(id)
    }

    /// Selected node.
    #[must_use]
    pub fn active<'a>(&self, scene: &'a Scene) -> Option<&'a VisualNode> {
        self.active.and_then(|id| scene.get(id))
    }

    /// Selected node, or a notice that nothing is selected.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::NoSelection`] when the selection is empty or stale.
    pub fn require(&self, scene: &Scene) -> SheetResult<NodeId> {
        self.active_id(scene).ok_or(SheetError::NoSelection)
    }

    /// Selected node, which must be of kind `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::NoSelection`] or [`SheetError::WrongKind`].
    pub fn require_kind(&self, scene: &Scene, expected: NodeKindTag) -> SheetResult<NodeId> {
        let node = self.active(scene).ok_or(SheetError::NoSelection)?;
        if node.kind() == expected {
            Ok(node.id)
        } else {
            Err(SheetError::WrongKind {
                expected,
                actual: node.kind(),
            })
        }
    }

    /// Forget `id` if it is the selected node. Call after deleting it.
    pub fn on_removed(&mut self, id: NodeId) {
        if self.active == Some(id) {
            self.active = None;
        }
    }
}
