//! Software rendering engine.
//!
//! Builds an SVG document for the requested canvas region and rasterizes it
//! with resvg into a tiny-skia pixmap. Bitmap-like content (images, pattern
//! tiles, charts) is embedded as base64 PNG, cached per node.

use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

use image::{ImageEncoder, RgbaImage};
use sheet_core::{NodeContent, PixelRect, Rect, Scene, TextContent, VisualNode};

use super::{
    content_box, effective_rect, intrinsic_size, local_paint_box, to_canvas, with_shadow,
    RectOptions, RenderEngine,
};
use crate::cache::{CacheStats, ContentCache, ContentRaster};
use crate::chart::{default_chart_renderer, ChartRenderer};
use crate::error::{RenderError, RenderResult};
use crate::image::{apply_filters, image_from_bitmap, png_data_uri};
use crate::pattern::generate_pattern;

/// CPU renderer backed by resvg.
pub struct SoftwareEngine {
    charts: Box<dyn ChartRenderer>,
    cache: Mutex<ContentCache>,
    svg_options: usvg::Options<'static>,
}

impl SoftwareEngine {
    /// Create an engine with the build's chart renderer and system fonts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_chart_renderer(default_chart_renderer())
    }

    /// Create an engine with a custom chart renderer.
    #[must_use]
    pub fn with_chart_renderer(charts: Box<dyn ChartRenderer>) -> Self {
        let mut svg_options = usvg::Options::default();
        let fontdb = svg_options.fontdb_mut();
        fontdb.load_system_fonts();
        if let Some(family) = fallback_family(fontdb) {
            tracing::debug!(%family, "serif fallback family replaced");
            fontdb.set_serif_family(family);
        }
        tracing::debug!(
            faces = svg_options.fontdb.len(),
            "software engine fonts loaded"
        );
        Self {
            charts,
            cache: Mutex::new(ContentCache::new()),
            svg_options,
        }
    }

    /// Content cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
            .clone()
    }

    /// Node-local box `node` paints, with text measured from its laid-out
    /// glyphs.
    fn local_box(&self, node: &VisualNode, options: RectOptions) -> Option<Rect> {
        match &node.content {
            NodeContent::Text(_) if content_box(&node.content).is_none() => None,
            NodeContent::Text(text) => match self.measure_text(text, options) {
                Some(measured) => Some(with_shadow(node, measured, options)),
                None => local_paint_box(node, options),
            },
            _ => local_paint_box(node, options),
        }
    }

    /// Glyph bounds of `text` as the rasterizer lays it out, or `None` if no
    /// font could shape it.
    fn measure_text(&self, text: &TextContent, options: RectOptions) -> Option<Rect> {
        let mut svg = String::from("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1\" height=\"1\">");
        render_text_svg(&mut svg, text);
        svg.push_str("</svg>");

        let tree = match usvg::Tree::from_str(&svg, &self.svg_options) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(error = %e, "text measurement failed");
                return None;
            }
        };
        let root = tree.root();
        if !root.has_children() {
            tracing::debug!(family = %text.font_family, "no glyphs laid out, estimating text size");
            return None;
        }
        let bounds = if options.include_stroke && text.stroke_width > 0.0 {
            root.abs_stroke_bounding_box()
        } else {
            root.abs_bounding_box()
        };
        Some(Rect::from_edges(
            f64::from(bounds.left()),
            f64::from(bounds.top()),
            f64::from(bounds.right()),
            f64::from(bounds.bottom()),
        ))
        .filter(Rect::is_valid)
    }

    /// Build the SVG document for `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if node content cannot be rendered or a tainted bitmap
    /// is visible.
    pub fn render_svg(
        &self,
        scene: &Scene,
        region: PixelRect,
        pixel_ratio: f64,
    ) -> RenderResult<String> {
        ensure_untainted(scene)?;

        let (out_w, out_h) = output_size(region, pixel_ratio);
        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"{} {} {} {}\">",
            region.x, region.y, region.width, region.height,
        );

        if let (Some(bg), Some(rect)) = (scene.background(), scene.background_rect()) {
            if bg.visible {
                let png = encode_png(&image_from_bitmap(&bg.bitmap)?)?;
                let _ = write!(
                    svg,
                    "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{}\"/>",
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    png_data_uri(&png),
                );
            }
        }

        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.retain(|id| scene.contains(id));
        }

        for (index, node) in scene.nodes().enumerate().filter(|(_, n)| n.visible) {
            self.render_node_svg(&mut svg, index, node)?;
        }

        svg.push_str("</svg>");
        Ok(svg)
    }

    fn render_node_svg(&self, svg: &mut String, index: usize, node: &VisualNode) -> RenderResult<()> {
        let t = &node.transform;
        let shadow = &node.effects.shadow;
        let filter_id = format!("shadow{index}");

        let shadow_region = shadow
            .is_active()
            .then(|| self.local_box(node, RectOptions::default()))
            .flatten();
        if let Some(region) = shadow_region.map(|r| r.expand(2.0)) {
            let _ = write!(
                svg,
                "<defs><filter id=\"{filter_id}\" filterUnits=\"userSpaceOnUse\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"><feDropShadow dx=\"{}\" dy=\"{}\" stdDeviation=\"{}\" flood-color=\"{}\" flood-opacity=\"{}\"/></filter></defs>",
                region.x,
                region.y,
                region.width,
                region.height,
                shadow.offset_x,
                shadow.offset_y,
                shadow.blur.max(0.0) / 2.0,
                shadow.color.to_hex_rgb(),
                shadow.opacity.clamp(0.0, 1.0),
            );
        }

        let _ = write!(
            svg,
            "<g transform=\"translate({},{}) rotate({}) scale({},{})\" opacity=\"{}\"",
            t.x,
            t.y,
            t.rotation,
            t.scale_x,
            t.scale_y,
            node.opacity.clamp(0.0, 1.0),
        );
        if shadow_region.is_some() {
            let _ = write!(svg, " filter=\"url(#{filter_id})\"");
        }
        svg.push('>');

        match &node.content {
            NodeContent::Text(text) => render_text_svg(svg, text),
            NodeContent::Image(_) | NodeContent::Chart(_) | NodeContent::Pattern(_) => {
                let raster = self.content_raster(node)?;
                let (width, height) = intrinsic_size(&node.content);
                let _ = write!(
                    svg,
                    "<image x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" preserveAspectRatio=\"none\" href=\"{}\"/>",
                    png_data_uri(&raster.png),
                );
            }
        }

        svg.push_str("</g>");
        Ok(())
    }

    fn content_raster(&self, node: &VisualNode) -> RenderResult<ContentRaster> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get_or_render(node.id(), &node.content, &node.effects.filters, || {
            match &node.content {
                NodeContent::Image(image) => {
                    let filtered = apply_filters(&image.bitmap, &node.effects.filters)?;
                    raster_from_image(&image_from_bitmap(&filtered)?)
                }
                NodeContent::Pattern(config) => {
                    let pixmap = generate_pattern(config)?;
                    let png = pixmap
                        .encode_png()
                        .map_err(|e| RenderError::Encode(format!("pattern PNG: {e}")))?;
                    Ok(ContentRaster {
                        width: pixmap.width(),
                        height: pixmap.height(),
                        png: png.into(),
                    })
                }
                NodeContent::Chart(config) => raster_from_image(&self.charts.render_config(config)?),
                NodeContent::Text(_) => Err(RenderError::Export(
                    "text is drawn as vector content".to_string(),
                )),
            }
        })
    }

    fn rasterize_svg(&self, svg: &str, width: u32, height: u32) -> RenderResult<tiny_skia::Pixmap> {
        let tree = usvg::Tree::from_str(svg, &self.svg_options)
            .map_err(|e| RenderError::Svg(format!("SVG parsing failed: {e}")))?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Export(format!("Failed to create {width}x{height} pixmap")))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
        Ok(pixmap)
    }
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SoftwareEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareEngine").finish_non_exhaustive()
    }
}

impl RenderEngine for SoftwareEngine {
    fn node_effective_rect(&self, node: &VisualNode, options: RectOptions) -> Option<Rect> {
        match &node.content {
            NodeContent::Text(_) => to_canvas(node, self.local_box(node, options)?),
            _ => effective_rect(node, options),
        }
    }

    fn rasterize_region(
        &self,
        scene: &Scene,
        region: PixelRect,
        pixel_ratio: f64,
    ) -> RenderResult<RgbaImage> {
        let svg = self.render_svg(scene, region, pixel_ratio)?;
        let (width, height) = output_size(region, pixel_ratio);
        let pixmap = self.rasterize_svg(&svg, width, height)?;

        let mut rgba = Vec::with_capacity(pixmap.data().len());
        for pixel in pixmap.pixels() {
            let c = pixel.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }

        tracing::debug!(
            x = region.x,
            y = region.y,
            width,
            height,
            nodes = scene.len(),
            "region rasterized"
        );
        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| RenderError::Export("raster size mismatch".to_string()))
    }
}

/// A family to use when the generic serif default is not installed.
fn fallback_family(db: &usvg::fontdb::Database) -> Option<String> {
    let serif = usvg::fontdb::Query {
        families: &[usvg::fontdb::Family::Serif],
        ..usvg::fontdb::Query::default()
    };
    if db.query(&serif).is_some() {
        return None;
    }
    let names: Vec<&str> = db
        .faces()
        .filter_map(|face| face.families.first().map(|(name, _)| name.as_str()))
        .collect();
    ["DejaVu Sans", "Liberation Sans", "Noto Sans"]
        .into_iter()
        .find(|preferred| names.contains(preferred))
        .or_else(|| names.first().copied())
        .map(str::to_string)
}

/// A canvas that has drawn a cross-origin bitmap can no longer be read back.
fn ensure_untainted(scene: &Scene) -> RenderResult<()> {
    let tainted_background = scene
        .background()
        .is_some_and(|bg| bg.visible && !bg.origin_clean);
    let tainted_node = scene.nodes().any(|n| {
        n.visible && matches!(&n.content, NodeContent::Image(image) if !image.origin_clean)
    });
    if tainted_background || tainted_node {
        return Err(RenderError::Tainted);
    }
    Ok(())
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn output_size(region: PixelRect, pixel_ratio: f64) -> (u32, u32) {
    let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        1.0
    };
    let w = (f64::from(region.width) * ratio).ceil().max(1.0) as u32;
    let h = (f64::from(region.height) * ratio).ceil().max(1.0) as u32;
    (w, h)
}

#[allow(clippy::cast_precision_loss)]
fn render_text_svg(svg: &mut String, text: &TextContent) {
    let step = f64::from(text.font_size) * f64::from(text.line_height);
    let _ = write!(
        svg,
        "<text font-size=\"{}\" font-family=\"{}\" font-weight=\"{}\" fill=\"{}\" fill-opacity=\"{}\"",
        text.font_size,
        escape_xml(&text.font_family),
        escape_xml(&text.font_weight),
        text.fill.to_hex_rgb(),
        text.fill.alpha_f32(),
    );
    if text.stroke_width > 0.0 {
        let _ = write!(
            svg,
            " stroke=\"{}\" stroke-opacity=\"{}\" stroke-width=\"{}\" paint-order=\"stroke\"",
            text.stroke.to_hex_rgb(),
            text.stroke.alpha_f32(),
            text.stroke_width,
        );
    }
    svg.push('>');

    for (i, line) in text.lines().enumerate() {
        let y = step * i as f64 + step / 2.0;
        let _ = write!(
            svg,
            "<tspan x=\"0\" y=\"{y}\" dominant-baseline=\"central\">{}</tspan>",
            escape_xml(line)
        );
    }
    svg.push_str("</text>");
}

fn raster_from_image(img: &RgbaImage) -> RenderResult<ContentRaster> {
    Ok(ContentRaster {
        width: img.width(),
        height: img.height(),
        png: encode_png(img)?.into(),
    })
}

/// Encode an RGBA image as PNG.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_png(img: &RgbaImage) -> RenderResult<Vec<u8>> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))?;
    Ok(buf)
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
