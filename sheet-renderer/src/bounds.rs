//! Content bounding box resolution.
//!
//! Finds the tight crop of everything visible on the canvas, measured with the
//! engine's effective rectangles so shadows, strokes, rotation and scale are
//! never clipped.

use sheet_core::{PixelRect, Rect, Scene};

use crate::backend::{RectOptions, RenderEngine};

/// Bleed used when no caller preference exists.
pub const DEFAULT_BLEED: f64 = 32.0;

/// Computes content rectangles against a rendering engine.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxResolver<'a, E: RenderEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: RenderEngine + ?Sized> BoundingBoxResolver<'a, E> {
    /// Resolver measuring with `engine`.
    #[must_use]
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Union of every visible rectangle in the background and main layers,
    /// or `None` if nothing contributed.
    #[must_use]
    pub fn content_union(&self, scene: &Scene) -> Option<Rect> {
        let background = self.engine.background_effective_rect(scene);
        let nodes = scene
            .nodes()
            .filter(|node| node.visible)
            .map(|node| self.engine.node_effective_rect(node, RectOptions::default()));

        std::iter::once(background)
            .chain(nodes)
            .flatten()
            .filter(Rect::is_valid)
            .reduce(|acc, rect| acc.union(&rect))
    }

    /// Tight integer crop of the visible content, grown by `bleed` on every
    /// side. Falls back to the full canvas when nothing is visible.
    #[must_use]
    pub fn compute_content_rect(&self, scene: &Scene, bleed: f64) -> PixelRect {
        let canvas = scene.canvas_rect();
        let content = self.content_union(scene).unwrap_or_else(|| {
            tracing::debug!("no visible content, measuring the full canvas");
            canvas
        });

        let bleed = if bleed.is_finite() { bleed.max(0.0) } else { 0.0 };
        PixelRect::enclosing(&content.expand(bleed))
            .or_else(|| {
                tracing::warn!(?content, bleed, "content rect not representable, using canvas");
                PixelRect::enclosing(&canvas)
            })
            .unwrap_or(PixelRect {
                x: 0,
                y: 0,
                width: scene.canvas_width().max(1),
                height: scene.canvas_height().max(1),
            })
    }
}
