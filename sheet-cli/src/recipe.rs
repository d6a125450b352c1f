//! JSON recipes: an ordered list of editor operations applied to a fresh document.
//!
//! ```json
//! {
//!   "width": 1600,
//!   "height": 1200,
//!   "operations": [
//!     { "op": "text", "text": "Quarterly\\nreview" },
//!     { "op": "move", "transform": { "x": 300, "y": 80 } },
//!     { "op": "pattern", "fields": { "patKind": "dots", "patSeed": "7" } },
//!     { "op": "order", "to": "back" },
//!     { "op": "reorder", "from": 0, "to": 1 },
//!     { "op": "select", "layer": 0 },
//!     { "op": "delete" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sheet_core::form::{read_chart_form, read_pattern_config};
use sheet_core::{
    BackgroundFit, Document, FormSnapshot, ImageContent, ImageFilters, NodeId, Shadow,
    TextContent, Transform, VisualNode,
};
use sheet_renderer::image::load_bitmap_from_file;

/// A document description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recipe {
    /// Canvas width; the command-line size is used when absent.
    #[serde(default)]
    pub width: Option<u32>,
    /// Canvas height; the command-line size is used when absent.
    #[serde(default)]
    pub height: Option<u32>,
    /// Operations in application order.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// Where to move the selected node in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackMove {
    /// One step toward the top.
    Up,
    /// One step toward the bottom.
    Down,
    /// Topmost.
    Front,
    /// Bottommost.
    Back,
}

/// One editor operation. Operations that act on "the selection" use the
/// node most recently added or picked with `select`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Add a text node.
    Text {
        /// Text; literal `\n` becomes a line break.
        text: String,
        /// Typography overrides.
        #[serde(default)]
        style: Option<TextContent>,
    },
    /// Add an image node from a file.
    Image {
        /// Path, relative to the recipe file.
        path: PathBuf,
        /// Node opacity.
        #[serde(default)]
        opacity: Option<f64>,
    },
    /// Add a pattern node from pattern form fields.
    Pattern {
        /// Form values keyed by control name.
        #[serde(default)]
        fields: BTreeMap<String, String>,
    },
    /// Add a radar chart node from chart form fields.
    Chart {
        /// Form values keyed by control name.
        #[serde(default)]
        fields: BTreeMap<String, String>,
    },
    /// Add a dataset to the selected chart.
    Dataset {
        /// Chart form values; only the dataset fields are used.
        #[serde(default)]
        fields: BTreeMap<String, String>,
    },
    /// Set the canvas background from a file.
    Background {
        /// Path, relative to the recipe file.
        path: PathBuf,
        /// Fit policy.
        #[serde(default)]
        fit: BackgroundFit,
    },
    /// Place the selected node.
    Move {
        /// New transform.
        transform: Transform,
    },
    /// Apply effects to the selected node.
    Effects {
        /// Drop shadow.
        #[serde(default)]
        shadow: Shadow,
        /// Image filters.
        #[serde(default)]
        filters: ImageFilters,
    },
    /// Hide the selected node.
    Hide,
    /// Restack the selected node.
    Order {
        /// Direction.
        to: StackMove,
    },
    /// Select a node by its layer list row.
    Select {
        /// Row, `0` being the topmost layer.
        layer: usize,
    },
    /// Delete the selected node.
    Delete,
    /// Drag a layer list row to another row.
    Reorder {
        /// Source row, `0` being the topmost layer.
        from: usize,
        /// Destination row.
        to: usize,
    },
}

impl Recipe {
    /// Parse a recipe from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a recipe.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid recipe JSON")
    }

    /// Read and parse a recipe file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in recipe {}", path.display()))
    }

    /// Build a document, resolving relative paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns the first operation that fails, with its position.
    pub fn build(&self, default_size: (u32, u32), base_dir: &Path) -> Result<Document> {
        let width = self.width.unwrap_or(default_size.0);
        let height = self.height.unwrap_or(default_size.1);
        let mut doc = Document::new(width, height);
        doc.resize(width, height);

        for (index, op) in self.operations.iter().enumerate() {
            apply(&mut doc, op, base_dir)
                .with_context(|| format!("operation {} ({})", index + 1, op.name()))?;
        }
        tracing::debug!(nodes = doc.scene().len(), "recipe applied");
        Ok(doc)
    }
}

impl Operation {
    /// The `op` tag of this operation.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Pattern { .. } => "pattern",
            Self::Chart { .. } => "chart",
            Self::Dataset { .. } => "dataset",
            Self::Background { .. } => "background",
            Self::Move { .. } => "move",
            Self::Effects { .. } => "effects",
            Self::Hide => "hide",
            Self::Order { .. } => "order",
            Self::Select { .. } => "select",
            Self::Delete => "delete",
            Self::Reorder { .. } => "reorder",
        }
    }
}

fn snapshot(fields: &BTreeMap<String, String>) -> FormSnapshot {
    fields
        .iter()
        .fold(FormSnapshot::new(), |form, (key, value)| form.with(key, value.as_str()))
}

fn selected_id(doc: &Document) -> Result<NodeId> {
    doc.selected()
        .map(VisualNode::id)
        .ok_or_else(|| anyhow::anyhow!("no node is selected"))
}

fn apply(doc: &mut Document, op: &Operation, base_dir: &Path) -> Result<()> {
    match op {
        Operation::Text { text, style } => {
            let content = TextContent {
                text: TextContent::new(text).text,
                ..style.clone().unwrap_or_default()
            };
            doc.add_text(content);
        }
        Operation::Image { path, opacity } => {
            let bitmap = load_bitmap_from_file(base_dir.join(path))?;
            doc.add_image(ImageContent::new(bitmap));
            if let Some(opacity) = opacity {
                doc.set_image_opacity(*opacity)?;
            }
        }
        Operation::Pattern { fields } => {
            doc.add_pattern(read_pattern_config(&snapshot(fields)));
        }
        Operation::Chart { fields } => {
            doc.add_chart(read_chart_form(&snapshot(fields)));
        }
        Operation::Dataset { fields } => {
            doc.add_dataset(read_chart_form(&snapshot(fields)).dataset)?;
        }
        Operation::Background { path, fit } => {
            let bitmap = load_bitmap_from_file(base_dir.join(path))?;
            doc.set_background(bitmap, *fit, true);
        }
        Operation::Move { transform } => {
            let id = selected_id(doc)?;
            doc.set_transform(id, *transform);
        }
        Operation::Effects { shadow, filters } => {
            doc.apply_effects(*shadow, *filters)?;
        }
        Operation::Hide => {
            let id = selected_id(doc)?;
            doc.set_visible(id, false);
        }
        Operation::Order { to } => {
            let id = selected_id(doc)?;
            match to {
                StackMove::Up => doc.raise(id),
                StackMove::Down => doc.lower(id),
                StackMove::Front => doc.bring_to_front(id),
                StackMove::Back => doc.send_to_back(id),
            };
        }
        Operation::Select { layer } => {
            let id = doc
                .scene()
                .display_order_top_to_bottom()
                .get(*layer)
                .map(|node| node.id())
                .ok_or_else(|| anyhow::anyhow!("no layer at row {layer}"))?;
            doc.select(id);
        }
        Operation::Delete => {
            let removed = doc.delete_selected()?;
            tracing::debug!(id = %removed.id(), "node deleted");
        }
        Operation::Reorder { from, to } => {
            let len = doc.scene().len();
            anyhow::ensure!(
                (*from).max(*to) < len,
                "cannot move layer {from} to {to} with {len} layers"
            );
            doc.reorder(*from, *to);
        }
    }
    Ok(())
}
