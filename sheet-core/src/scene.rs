//! Scene graph: the ordered node collection plus an optional background.
//!
//! Nodes are stored bottom-to-top, so a node's position in storage is its
//! `z_index`. Operations addressed by a stale id are no-ops.

use crate::geometry::{fit_background, BackgroundFit, Rect};
use crate::node::{Bitmap, NodeId, VisualNode};

/// Stage width used when none (or zero) is configured.
pub const DEFAULT_CANVAS_WIDTH: u32 = 1600;
/// Stage height used when none (or zero) is configured.
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1200;

/// Bitmap drawn beneath every node, fitted to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    /// Decoded pixels.
    pub bitmap: Bitmap,
    /// Fit policy.
    pub fit: BackgroundFit,
    /// Hidden backgrounds are neither drawn nor measured.
    pub visible: bool,
    /// Same meaning as [`crate::ImageContent::origin_clean`].
    pub origin_clean: bool,
}

/// A scene containing all sheet nodes.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Bottom-to-top.
    nodes: Vec<VisualNode>,
    background: Option<Background>,
    canvas_width: u32,
    canvas_height: u32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

impl Scene {
    /// Create an empty scene. Zero dimensions fall back to the defaults.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut scene = Self {
            nodes: Vec::new(),
            background: None,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
        };
        scene.resize(width, height);
        scene
    }

    /// Canvas width in pixels.
    #[must_use]
    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    /// Canvas height in pixels.
    #[must_use]
    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    /// The full canvas rectangle.
    #[must_use]
    pub fn canvas_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.canvas_width),
            f64::from(self.canvas_height),
        )
    }

    /// Resize the canvas. Zero dimensions fall back to the defaults.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas_width = if width == 0 { DEFAULT_CANVAS_WIDTH } else { width };
        self.canvas_height = if height == 0 {
            DEFAULT_CANVAS_HEIGHT
        } else {
            height
        };
        tracing::debug!(
            width = self.canvas_width,
            height = self.canvas_height,
            "canvas resized"
        );
    }

    /// Append a node at the top of the z-order.
    pub fn add(&mut self, mut node: VisualNode) -> NodeId {
        let id = node.id;
        node.z_index = self.nodes.len();
        tracing::debug!(%id, kind = %node.kind(), z = node.z_index, "node added");
        self.nodes.push(node);
        id
    }

    /// Delete a node and re-densify the remaining z-indices.
    ///
    /// Returns `None` if the id is unknown.
    pub fn remove(&mut self, id: NodeId) -> Option<VisualNode> {
        let pos = self.position(id)?;
        let removed = self.nodes.remove(pos);
        self.renumber();
        tracing::debug!(%id, remaining = self.nodes.len(), "node removed");
        Some(removed)
    }

    /// Set a node's visibility. Returns false if the id is unknown.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Get a node by ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get a mutable reference to a node by ID.
    ///
    /// Identity and stacking position are not writable outside this crate;
    /// use the z-order operations to restack.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut VisualNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Whether the node exists.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Nodes bottom-to-top.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &VisualNode> + ExactSizeIterator {
        self.nodes.iter()
    }

    /// Nodes sorted by descending `z_index`; the order the layer list shows.
    #[must_use]
    pub fn display_order_top_to_bottom(&self) -> Vec<&VisualNode> {
        self.nodes.iter().rev().collect()
    }

    /// Get the number of nodes in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the scene has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current background.
    #[must_use]
    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    /// Replace the background.
    pub fn set_background(&mut self, background: Background) {
        tracing::debug!(
            width = background.bitmap.width(),
            height = background.bitmap.height(),
            fit = ?background.fit,
            "background set"
        );
        self.background = Some(background);
    }

    /// Change the fit policy of the current background.
    pub fn set_background_fit(&mut self, fit: BackgroundFit) {
        if let Some(bg) = &mut self.background {
            bg.fit = fit;
        }
    }

    /// Remove the background.
    pub fn clear_background(&mut self) -> Option<Background> {
        self.background.take()
    }

    /// Where the background is drawn, refitted to the current canvas size.
    #[must_use]
    pub fn background_rect(&self) -> Option<Rect> {
        let bg = self.background.as_ref()?;
        Some(fit_background(
            f64::from(bg.bitmap.width()),
            f64::from(bg.bitmap.height()),
            f64::from(self.canvas_width),
            f64::from(self.canvas_height),
            bg.fit,
        ))
    }

    pub(crate) fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Reorder storage to `bottom_to_top` (a permutation of current ids)
    /// and assign `z_index = position`.
    pub(crate) fn apply_order(&mut self, bottom_to_top: &[NodeId]) {
        debug_assert_eq!(bottom_to_top.len(), self.nodes.len());
        let mut remaining = std::mem::take(&mut self.nodes);
        for id in bottom_to_top {
            if let Some(pos) = remaining.iter().position(|n| n.id == *id) {
                self.nodes.push(remaining.remove(pos));
            }
        }
        // ids not named keep their relative order on top
        self.nodes.append(&mut remaining);
        self.renumber();
    }

    fn renumber(&mut self) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.z_index = i;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeContent, TextContent};

    fn text(s: &str) -> VisualNode {
        VisualNode::new(NodeContent::Text(TextContent::new(s)))
    }

    #[test]
    fn test_scene_add_remove() {
        let mut scene = Scene::new(800, 600);
        assert!(scene.is_empty());

        let id = scene.add(text("Hello"));
        assert_eq!(scene.len(), 1);
        assert!(scene.get(id).is_some());

        scene.remove(id).expect("should remove");
        assert!(scene.is_empty());
    }

    #[test]
    fn test_add_appends_on_top() {
        let mut scene = Scene::default();
        let a = scene.add(text("a"));
        let b = scene.add(text("b"));
        let c = scene.add(text("c"));
        let order: Vec<_> = scene
            .display_order_top_to_bottom()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(order, vec![c, b, a]);
        assert_eq!(scene.get(c).map(|n| n.z_index), Some(2));
    }

    #[test]
    fn test_remove_redensifies() {
        let mut scene = Scene::default();
        let a = scene.add(text("a"));
        let b = scene.add(text("b"));
        let c = scene.add(text("c"));
        scene.remove(b);
        assert_eq!(scene.get(a).map(|n| n.z_index), Some(0));
        assert_eq!(scene.get(c).map(|n| n.z_index), Some(1));
    }

    #[test]
    fn test_get_mut_keeps_stacking_and_identity() {
        let mut scene = Scene::default();
        let a = scene.add(text("a"));
        let b = scene.add(text("b"));
        if let Some(node) = scene.get_mut(a) {
            node.transform.x = 40.0;
            node.opacity = 0.5;
            node.visible = false;
        }
        let node = scene.get(a).expect("node");
        assert_eq!(node.id(), a);
        assert_eq!(node.z_index(), 0);
        assert_eq!(scene.get(b).map(VisualNode::z_index), Some(1));
        assert!(scene.z_order_is_dense());
    }

    #[test]
    fn test_stale_ids_are_noops() {
        let mut scene = Scene::default();
        let a = scene.add(text("a"));
        scene.remove(a);
        assert!(scene.remove(a).is_none());
        assert!(!scene.set_visible(a, false));
    }

    #[test]
    fn test_zero_size_falls_back() {
        let scene = Scene::new(0, 0);
        assert_eq!(scene.canvas_width(), DEFAULT_CANVAS_WIDTH);
        assert_eq!(scene.canvas_height(), DEFAULT_CANVAS_HEIGHT);
    }

    #[test]
    fn test_background_refits_on_resize() {
        let mut scene = Scene::new(100, 100);
        scene.set_background(Background {
            bitmap: Bitmap::from_rgba(2, 1, vec![0; 8]).expect("bitmap"),
            fit: BackgroundFit::Contain,
            visible: true,
            origin_clean: true,
        });
        assert_eq!(scene.background_rect(), Some(Rect::new(0.0, 25.0, 100.0, 50.0)));
        scene.resize(200, 100);
        assert_eq!(scene.background_rect(), Some(Rect::new(0.0, 0.0, 200.0, 100.0)));
    }
}
