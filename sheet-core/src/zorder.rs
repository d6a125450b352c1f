//! Z-order manager: list reordering and explicit raise/lower.
//!
//! Every operation rewrites the whole ordering and reassigns `z_index`
//! from scratch, so indices stay dense in `0..n`.

use crate::node::NodeId;
use crate::Scene;

impl Scene {
    /// Move the node at top-to-bottom display position `from` to `to`.
    ///
    /// Returns false (and changes nothing) when `from == to` or either
    /// index is out of range, which is how a drop that races with a
    /// delete resolves.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let n = self.len();
        if from == to || from >= n || to >= n {
            return false;
        }

        let mut display: Vec<NodeId> = self
            .display_order_top_to_bottom()
            .iter()
            .map(|n| n.id)
            .collect();
        let moved = display.remove(from);
        display.insert(to, moved);
        display.reverse();
        self.apply_order(&display);

        tracing::debug!(%moved, from, to, "layer reordered");
        true
    }

    /// Move a node one step up. Returns false if unknown or already on top.
    pub fn raise(&mut self, id: NodeId) -> bool {
        match self.display_position(id) {
            Some(pos) if pos > 0 => self.reorder(pos, pos - 1),
            _ => false,
        }
    }

    /// Move a node one step down. Returns false if unknown or already at the bottom.
    pub fn lower(&mut self, id: NodeId) -> bool {
        match self.display_position(id) {
            Some(pos) if pos + 1 < self.len() => self.reorder(pos, pos + 1),
            _ => false,
        }
    }

    /// Move a node to the top.
    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        match self.display_position(id) {
            Some(pos) => self.reorder(pos, 0),
            None => false,
        }
    }

    /// Move a node to the bottom.
    pub fn send_to_back(&mut self, id: NodeId) -> bool {
        let last = self.len().saturating_sub(1);
        match self.display_position(id) {
            Some(pos) => self.reorder(pos, last),
            None => false,
        }
    }

    /// Top-to-bottom display position of a node.
    #[must_use]
    pub fn display_position(&self, id: NodeId) -> Option<usize> {
        self.position(id).map(|z| self.len() - 1 - z)
    }

    /// Whether the z-indices are exactly `0..n` with no duplicates.
    #[must_use]
    pub fn z_order_is_dense(&self) -> bool {
        let mut seen = vec![false; self.len()];
        for node in self.nodes() {
            match seen.get_mut(node.z_index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }
}
