//! Rendering engine capability.
//!
//! The export path only needs two things from an engine: the on-canvas
//! rectangle a node really paints (including stroke, shadow, rotation and
//! scale) and a raster of an arbitrary canvas region.

pub mod software;

use image::RgbaImage;
use sheet_core::{NodeContent, PixelRect, Rect, Scene, VisualNode};

use crate::chart::CHART_SIZE;
use crate::RenderResult;

pub use software::SoftwareEngine;

/// Horizontal advance of one glyph relative to the font size.
const GLYPH_ADVANCE: f64 = 0.6;

/// What to include when measuring a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectOptions {
    /// Grow the rect to cover the drop shadow.
    pub include_shadow: bool,
    /// Grow the rect to cover the outline stroke.
    pub include_stroke: bool,
}

impl Default for RectOptions {
    fn default() -> Self {
        Self {
            include_shadow: true,
            include_stroke: true,
        }
    }
}

/// Trait for rendering engines.
pub trait RenderEngine {
    /// The canvas-space rectangle `node` paints, or `None` if it has no extent.
    fn node_effective_rect(&self, node: &VisualNode, options: RectOptions) -> Option<Rect>;

    /// The canvas-space rectangle of the visible background bitmap.
    fn background_effective_rect(&self, scene: &Scene) -> Option<Rect> {
        scene
            .background()
            .filter(|bg| bg.visible)
            .and_then(|_| scene.background_rect())
    }

    /// Rasterize `region` of the canvas at `pixel_ratio` device pixels per
    /// canvas pixel. Hidden nodes are not drawn.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::Tainted`] if a cross-origin bitmap would be
    /// read back, or another error if drawing fails.
    fn rasterize_region(
        &self,
        scene: &Scene,
        region: PixelRect,
        pixel_ratio: f64,
    ) -> RenderResult<RgbaImage>;
}

/// Unscaled, unrotated size of a node's content.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn intrinsic_size(content: &NodeContent) -> (f64, f64) {
    match content {
        NodeContent::Text(text) => {
            let font_size = f64::from(text.font_size);
            let (lines, longest) = text
                .lines()
                .fold((0usize, 0usize), |(n, w), line| (n + 1, w.max(line.chars().count())));
            (
                longest as f64 * font_size * GLYPH_ADVANCE,
                lines as f64 * font_size * f64::from(text.line_height),
            )
        }
        NodeContent::Image(image) => (
            f64::from(image.bitmap.width()),
            f64::from(image.bitmap.height()),
        ),
        NodeContent::Chart(_) => (f64::from(CHART_SIZE), f64::from(CHART_SIZE)),
        NodeContent::Pattern(config) => {
            let size = f64::from(config.normalized().canvas_size);
            (size, size)
        }
    }
}

/// Node-local box of the content alone, or `None` if it has no area.
#[must_use]
pub fn content_box(content: &NodeContent) -> Option<Rect> {
    let (w, h) = intrinsic_size(content);
    Some(Rect::new(0.0, 0.0, w, h)).filter(Rect::is_valid)
}

/// Grow a node-local box to cover the node's drop shadow.
#[must_use]
pub fn with_shadow(node: &VisualNode, local: Rect, options: RectOptions) -> Rect {
    let shadow = &node.effects.shadow;
    if !(options.include_shadow && shadow.is_active()) {
        return local;
    }
    let cast = local
        .translate(shadow.offset_x, shadow.offset_y)
        .expand(shadow.blur.max(0.0));
    local.union(&cast)
}

/// Node-local box covering content, stroke and shadow.
#[must_use]
pub fn local_paint_box(node: &VisualNode, options: RectOptions) -> Option<Rect> {
    let mut local = content_box(&node.content)?;

    if options.include_stroke {
        if let NodeContent::Text(text) = &node.content {
            if text.stroke_width > 0.0 {
                local = local.expand(f64::from(text.stroke_width) / 2.0);
            }
        }
    }

    Some(with_shadow(node, local, options))
}

/// Map a node-local box to canvas space through the node's transform.
#[must_use]
pub fn to_canvas(node: &VisualNode, local: Rect) -> Option<Rect> {
    if !local.is_valid() {
        return None;
    }
    let corners = local
        .corners()
        .map(|(x, y)| node.transform.apply(x, y));
    Rect::bounding(&corners).filter(Rect::is_valid)
}

/// Canvas-space bounds of a node from its intrinsic size.
///
/// Text is sized from a fixed glyph advance here. Engines that lay text out
/// should measure it instead.
#[must_use]
pub fn effective_rect(node: &VisualNode, options: RectOptions) -> Option<Rect> {
    to_canvas(node, local_paint_box(node, options)?)
}

#[cfg(test)]
mod tests {
    use sheet_core::{Effects, PatternConfig, Shadow, TextContent, Transform};

    use super::*;

    fn pattern_node(size: u32, x: f64, y: f64) -> VisualNode {
        VisualNode::new(NodeContent::Pattern(PatternConfig {
            canvas_size: size,
            ..PatternConfig::default()
        }))
        .with_transform(Transform::at(x, y))
    }

    fn assert_rect(actual: Rect, expected: Rect) {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(
            close(actual.x, expected.x)
                && close(actual.y, expected.y)
                && close(actual.width, expected.width)
                && close(actual.height, expected.height),
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn test_plain_node_rect() {
        let node = pattern_node(300, 10.0, 20.0);
        let rect = effective_rect(&node, RectOptions::default()).expect("rect");
        assert_rect(rect, Rect::new(10.0, 20.0, 300.0, 300.0));
    }

    #[test]
    fn test_shadow_extends_rect() {
        let node = pattern_node(200, 0.0, 0.0).with_effects(Effects {
            shadow: Shadow {
                blur: 5.0,
                offset_x: 10.0,
                offset_y: -4.0,
                opacity: 0.5,
                enabled: true,
                ..Shadow::default()
            },
            ..Effects::default()
        });
        let with = effective_rect(&node, RectOptions::default()).expect("rect");
        assert_rect(with, Rect::from_edges(0.0, -9.0, 215.0, 201.0));

        let without = effective_rect(
            &node,
            RectOptions {
                include_shadow: false,
                include_stroke: true,
            },
        )
        .expect("rect");
        assert_rect(without, Rect::new(0.0, 0.0, 200.0, 200.0));
    }

    #[test]
    fn test_disabled_shadow_ignored() {
        let node = pattern_node(200, 0.0, 0.0).with_effects(Effects {
            shadow: Shadow {
                blur: 50.0,
                offset_x: 50.0,
                opacity: 1.0,
                enabled: false,
                ..Shadow::default()
            },
            ..Effects::default()
        });
        let rect = effective_rect(&node, RectOptions::default()).expect("rect");
        assert_rect(rect, Rect::new(0.0, 0.0, 200.0, 200.0));
    }

    #[test]
    fn test_rotation_and_scale() {
        let mut node = pattern_node(200, 100.0, 100.0);
        node.transform.rotation = 90.0;
        node.transform.scale_x = 2.0;
        let rect = effective_rect(&node, RectOptions::default()).expect("rect");
        // width 400 along +y, height 200 along -x
        assert_rect(rect, Rect::new(-100.0, 100.0, 200.0, 400.0));
    }

    #[test]
    fn test_text_stroke_and_size() {
        let mut text = TextContent::new("abcd\\nxy");
        text.font_size = 10.0;
        text.line_height = 1.5;
        text.stroke_width = 2.0;
        let node = VisualNode::new(NodeContent::Text(text));

        let (w, h) = intrinsic_size(&node.content);
        assert!((w - 24.0).abs() < 1e-9);
        assert!((h - 30.0).abs() < 1e-9);

        let rect = effective_rect(&node, RectOptions::default()).expect("rect");
        assert_rect(rect, Rect::new(-1.0, -1.0, 26.0, 32.0));
    }

    #[test]
    fn test_empty_text_has_no_rect() {
        let node = VisualNode::new(NodeContent::Text(TextContent::new("")));
        assert!(effective_rect(&node, RectOptions::default()).is_none());
    }

    #[test]
    fn test_empty_stroked_shadowed_text_has_no_rect() {
        let mut text = TextContent::new("");
        text.stroke_width = 6.0;
        let node = VisualNode::new(NodeContent::Text(text)).with_effects(Effects {
            shadow: Shadow {
                blur: 10.0,
                offset_x: 4.0,
                opacity: 1.0,
                enabled: true,
                ..Shadow::default()
            },
            ..Effects::default()
        });
        assert!(content_box(&node.content).is_none());
        assert!(local_paint_box(&node, RectOptions::default()).is_none());
        assert!(effective_rect(&node, RectOptions::default()).is_none());
    }
}
