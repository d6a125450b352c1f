//! Document state: scene, selection and naming for one editing session.
//!
//! All user-driven mutations go through [`Document`]; each one runs to
//! completion before the next, so the scene is never observed mid-update.

use crate::dataset::{ChartConfig, Dataset};
use crate::form::ChartForm;
use crate::geometry::BackgroundFit;
use crate::naming::NamingRegistry;
use crate::node::{
    Bitmap, Effects, ImageContent, ImageFilters, NodeContent, NodeId, NodeKindTag, Shadow,
    TextContent, Transform, VisualNode,
};
use crate::pattern::PatternConfig;
use crate::scene::Background;
use crate::selection::SelectionController;
use crate::{Scene, SheetError, SheetResult};

/// Where newly added text nodes are placed.
pub const TEXT_ORIGIN: (f64, f64) = (120.0, 120.0);
/// Where newly added image nodes are placed.
pub const IMAGE_ORIGIN: (f64, f64) = (100.0, 100.0);
/// Where newly added chart nodes are placed.
pub const CHART_ORIGIN: (f64, f64) = (200.0, 200.0);
/// Where newly added pattern nodes are placed.
pub const PATTERN_ORIGIN: (f64, f64) = (120.0, 120.0);

/// One row of the layer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    /// Node id.
    pub id: NodeId,
    /// Display name such as `Image_2`.
    pub name: String,
    /// Node kind.
    pub kind: NodeKindTag,
    /// Visibility.
    pub visible: bool,
    /// Whether this is the selected node.
    pub active: bool,
}

/// An open sheet document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    scene: Scene,
    selection: SelectionController,
    names: NamingRegistry,
}

impl Document {
    /// Create an empty document with the given canvas size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            scene: Scene::new(width, height),
            selection: SelectionController::new(),
            names: NamingRegistry::new(),
        }
    }

    /// Start a new document: clears nodes, background, selection and name counters.
    pub fn reset(&mut self) {
        let (w, h) = (self.scene.canvas_width(), self.scene.canvas_height());
        *self = Self::new(w, h);
        tracing::debug!("document reset");
    }

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Resize the canvas; the background is refitted.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }

    // ---------------------------------------------------------------
    // Adding nodes
    // ---------------------------------------------------------------

    fn insert(&mut self, node: VisualNode) -> NodeId {
        let id = self.scene.add(node);
        self.selection.select(&self.scene, id);
        id
    }

    /// Add a text node on top and select it.
    pub fn add_text(&mut self, text: TextContent) -> NodeId {
        let (x, y) = TEXT_ORIGIN;
        self.insert(VisualNode::new(NodeContent::Text(text)).with_transform(Transform::at(x, y)))
    }

    /// Add an image node on top and select it.
    pub fn add_image(&mut self, image: ImageContent) -> NodeId {
        let (x, y) = IMAGE_ORIGIN;
        self.insert(VisualNode::new(NodeContent::Image(image)).with_transform(Transform::at(x, y)))
    }

    /// Add a radar chart node built from a chart form and select it.
    ///
    /// Fewer than three labels is accepted; placeholders are added when
    /// the chart is drawn.
    pub fn add_chart(&mut self, form: ChartForm) -> NodeId {
        let (x, y) = CHART_ORIGIN;
        let config = ChartConfig::new(form.labels, form.min, form.max, form.dataset);
        self.insert(VisualNode::new(NodeContent::Chart(config)).with_transform(Transform::at(x, y)))
    }

    /// Add a pattern node and select it. Its opacity comes from the config.
    pub fn add_pattern(&mut self, config: PatternConfig) -> NodeId {
        let (x, y) = PATTERN_ORIGIN;
        let config = config.normalized();
        let opacity = config.opacity;
        self.insert(
            VisualNode::new(NodeContent::Pattern(config))
                .with_transform(Transform::at(x, y))
                .with_opacity(opacity),
        )
    }

    // ---------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------

    /// Select a node. Unknown ids clear the selection.
    pub fn select(&mut self, id: NodeId) -> bool {
        self.selection.select(&self.scene, id)
    }

    /// Clear the selection (click on empty canvas).
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// The selected node.
    #[must_use]
    pub fn selected(&self) -> Option<&VisualNode> {
        self.selection.active(&self.scene)
    }

    /// The selected chart's configuration; `None` hides the dataset panel.
    #[must_use]
    pub fn selected_chart(&self) -> Option<&ChartConfig> {
        match &self.selected()?.content {
            NodeContent::Chart(cfg) => Some(cfg),
            _ => None,
        }
    }

    // ---------------------------------------------------------------
    // Layer list operations
    // ---------------------------------------------------------------

    /// Layer list rows, top to bottom. Assigns names on first display.
    pub fn layer_list(&mut self) -> Vec<LayerEntry> {
        let rows: Vec<(NodeId, NodeKindTag, bool)> = self
            .scene
            .display_order_top_to_bottom()
            .iter()
            .map(|n| (n.id, n.kind(), n.visible))
            .collect();
        rows.into_iter()
            .map(|(id, kind, visible)| LayerEntry {
                id,
                name: self.names.display_name(id, kind).to_string(),
                kind,
                visible,
                active: self.selection.is_active(id),
            })
            .collect()
    }

    /// Name of a node, assigning one if needed.
    pub fn display_name(&mut self, id: NodeId) -> Option<String> {
        let kind = self.scene.get(id)?.kind();
        Some(self.names.display_name(id, kind).to_string())
    }

    /// Flip a node's visibility. Returns the new state, `None` if stale.
    pub fn toggle_visible(&mut self, id: NodeId) -> Option<bool> {
        let visible = !self.scene.get(id)?.visible;
        self.scene.set_visible(id, visible);
        Some(visible)
    }

    /// Set a node's visibility. False if the id is stale.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        self.scene.set_visible(id, visible)
    }

    /// Drag-and-drop in the layer list (top-to-bottom positions).
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        self.scene.reorder(from, to)
    }

    /// Move a node one step up.
    pub fn raise(&mut self, id: NodeId) -> bool {
        self.scene.raise(id)
    }

    /// Move a node one step down.
    pub fn lower(&mut self, id: NodeId) -> bool {
        self.scene.lower(id)
    }

    /// Move a node to the top.
    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        self.scene.bring_to_front(id)
    }

    /// Move a node to the bottom.
    pub fn send_to_back(&mut self, id: NodeId) -> bool {
        self.scene.send_to_back(id)
    }

    /// Delete a node. Stale ids are ignored.
    pub fn delete(&mut self, id: NodeId) -> Option<VisualNode> {
        let removed = self.scene.remove(id)?;
        self.selection.on_removed(id);
        self.names.forget(id);
        Some(removed)
    }

    /// Delete the selected node (Delete key).
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::NoSelection`] if nothing is selected.
    pub fn delete_selected(&mut self) -> SheetResult<VisualNode> {
        let id = self.selection.require(&self.scene)?;
        self.delete(id).ok_or(SheetError::NoSelection)
    }

    /// Move a node.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        match self.scene.get_mut(id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    // ---------------------------------------------------------------
    // Content updates on the selected node
    // ---------------------------------------------------------------

    fn selected_mut(&mut self, kind: NodeKindTag) -> SheetResult<&mut VisualNode> {
        let id = self.selection.require_kind(&self.scene, kind)?;
        self.scene.get_mut(id).ok_or(SheetError::NoSelection)
    }

    /// Replace the selected text node's content.
    ///
    /// # Errors
    ///
    /// Returns a notice if no text node is selected.
    pub fn update_text(&mut self, text: TextContent) -> SheetResult<()> {
        let node = self.selected_mut(NodeKindTag::Text)?;
        node.content = NodeContent::Text(text);
        Ok(())
    }

    /// Replace the selected pattern's config (and opacity).
    ///
    /// # Errors
    ///
    /// Returns a notice if no pattern node is selected.
    pub fn update_pattern(&mut self, config: PatternConfig) -> SheetResult<()> {
        let node = self.selected_mut(NodeKindTag::Pattern)?;
        let config = config.normalized();
        node.opacity = config.opacity;
        node.content = NodeContent::Pattern(config);
        Ok(())
    }

    /// Set the selected image's opacity.
    ///
    /// # Errors
    ///
    /// Returns a notice if no image node is selected.
    pub fn set_image_opacity(&mut self, opacity: f64) -> SheetResult<()> {
        let node = self.selected_mut(NodeKindTag::Image)?;
        node.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    fn selected_chart_mut(&mut self) -> SheetResult<&mut ChartConfig> {
        match &mut self.selected_mut(NodeKindTag::Chart)?.content {
            NodeContent::Chart(cfg) => Ok(cfg),
            other => Err(SheetError::WrongKind {
                expected: NodeKindTag::Chart,
                actual: other.tag(),
            }),
        }
    }

    /// Replace labels and range of the selected chart.
    ///
    /// # Errors
    ///
    /// Returns a notice if no chart node is selected.
    pub fn update_chart(&mut self, labels: Vec<String>, min: f64, max: f64) -> SheetResult<()> {
        self.selected_chart_mut()?.update_all(labels, min, max);
        Ok(())
    }

    /// Append a dataset to the selected chart.
    ///
    /// # Errors
    ///
    /// Returns a notice if no chart node is selected.
    pub fn add_dataset(&mut self, dataset: Dataset) -> SheetResult<usize> {
        Ok(self.selected_chart_mut()?.add_dataset(dataset))
    }

    /// Remove a dataset from the selected chart.
    ///
    /// # Errors
    ///
    /// Returns a notice if no chart is selected or the index is out of range.
    pub fn remove_dataset(&mut self, index: usize) -> SheetResult<Dataset> {
        self.selected_chart_mut()?.remove_dataset(index)
    }

    /// Select a dataset in the selected chart's panel.
    ///
    /// # Errors
    ///
    /// Returns a notice if no chart is selected or the index is out of range.
    pub fn select_dataset(&mut self, index: usize) -> SheetResult<()> {
        self.selected_chart_mut()?.select_dataset(index)
    }

    /// Remove the panel-selected dataset of the selected chart.
    ///
    /// # Errors
    ///
    /// Returns a notice if no chart is selected. `Ok(None)` when no dataset is selected.
    pub fn remove_selected_dataset(&mut self) -> SheetResult<Option<Dataset>> {
        Ok(self.selected_chart_mut()?.remove_selected_dataset())
    }

    /// Toggle a dataset's visibility in the selected chart.
    ///
    /// # Errors
    ///
    /// Returns a notice if no chart is selected or the index is out of range.
    pub fn toggle_dataset(&mut self, index: usize) -> SheetResult<bool> {
        self.selected_chart_mut()?.toggle_visible(index)
    }

    // ---------------------------------------------------------------
    // Effects
    // ---------------------------------------------------------------

    /// Apply a shadow to the selected node, and filters if it is an image.
    ///
    /// A disabled shadow is stored zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::NoSelection`] if nothing is selected.
    pub fn apply_effects(&mut self, shadow: Shadow, filters: ImageFilters) -> SheetResult<()> {
        let id = self.selection.require(&self.scene)?;
        let node = self.scene.get_mut(id).ok_or(SheetError::NoSelection)?;
        let shadow = if shadow.enabled {
            shadow
        } else {
            Shadow {
                color: shadow.color,
                ..Shadow::default()
            }
        };
        let filters = if node.kind() == NodeKindTag::Image {
            ImageFilters {
                blur_radius: filters.blur_radius.filter(|r| *r > 0.0),
                hsl: filters.hsl,
            }
        } else {
            ImageFilters::default()
        };
        node.effects = Effects { shadow, filters };
        tracing::debug!(%id, effects = ?node.effects, "effects applied");
        Ok(())
    }

    /// Clear shadow and filters on the selected node.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::NoSelection`] if nothing is selected.
    pub fn reset_effects(&mut self) -> SheetResult<()> {
        let id = self.selection.require(&self.scene)?;
        if let Some(node) = self.scene.get_mut(id) {
            node.effects = Effects::default();
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Background
    // ---------------------------------------------------------------

    /// Set the background bitmap.
    pub fn set_background(&mut self, bitmap: Bitmap, fit: BackgroundFit, origin_clean: bool) {
        self.scene.set_background(Background {
            bitmap,
            fit,
            visible: true,
            origin_clean,
        });
    }

    /// Change the background fit policy.
    pub fn set_background_fit(&mut self, fit: BackgroundFit) {
        self.scene.set_background_fit(fit);
    }

    /// Remove the background.
    pub fn clear_background(&mut self) {
        self.scene.clear_background();
    }
}
