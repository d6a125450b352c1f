//! Flattened PNG export.
//!
//! The compositor crops the scene to its content rectangle (plus bleed),
//! rasterizes that region at 1:1, places it on a background with a margin,
//! encodes PNG and persists it through the strategy chain.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, NaiveDateTime};
use image::{Rgba, RgbaImage};
use serde::Serialize;
use sheet_core::{Color, PixelRect, Scene};

use crate::backend::software::encode_png;
use crate::backend::RenderEngine;
use crate::bounds::BoundingBoxResolver;
use crate::error::{RenderError, RenderResult};
use crate::filename::{dated_filename, DEFAULT_PREFIX};
use crate::persist::{default_strategies, persist_with_fallback, PersistHost, PersistStrategy, PersistedVia};

/// Bleed around the content rect, enough for default shadow ranges.
pub const EXPORT_BLEED: f64 = 16.0;

/// Export settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Empty border around the content, in pixels.
    pub margin: u32,
    /// Leave the background transparent instead of filling it.
    pub transparent: bool,
    /// Fill color when not transparent.
    pub background: Color,
    /// Filename prefix.
    pub prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            margin: 0,
            transparent: false,
            background: Color::WHITE,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// A composed, not yet persisted export.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Canvas region that was rasterized.
    pub rect: PixelRect,
    /// Final raster including margin.
    pub image: RgbaImage,
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Filename handed to the host.
    pub filename: String,
    /// Canvas region that was rasterized.
    pub rect: PixelRect,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Encoded size in bytes.
    pub bytes: usize,
    /// Which strategy persisted the file.
    pub via: PersistedVia,
}

/// Allows at most one export in flight.
#[derive(Debug, Default)]
pub struct ExportGate {
    busy: AtomicBool,
}

/// Held while an export runs; releases the gate when dropped.
#[derive(Debug)]
pub struct ExportPermit<'g> {
    gate: &'g ExportGate,
}

impl ExportGate {
    /// Create an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the gate.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ExportInProgress`] if another export holds it.
    pub fn try_acquire(&self) -> RenderResult<ExportPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ExportPermit { gate: self })
            .map_err(|_| RenderError::ExportInProgress)
    }

    /// Whether an export currently holds the gate.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for ExportPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

/// Orchestrates bounds, rasterization, compositing and persistence.
pub struct Compositor<E, H> {
    engine: E,
    host: H,
    strategies: Vec<Box<dyn PersistStrategy + Send + Sync>>,
    gate: ExportGate,
}

impl<E: RenderEngine, H: PersistHost> Compositor<E, H> {
    /// Compositor with the standard persistence chain.
    #[must_use]
    pub fn new(engine: E, host: H) -> Self {
        Self::with_strategies(engine, host, default_strategies())
    }

    /// Compositor with a custom persistence chain.
    #[must_use]
    pub fn with_strategies(
        engine: E,
        host: H,
        strategies: Vec<Box<dyn PersistStrategy + Send + Sync>>,
    ) -> Self {
        Self {
            engine,
            host,
            strategies,
            gate: ExportGate::new(),
        }
    }

    /// The rendering engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The persistence host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The in-flight guard.
    #[must_use]
    pub fn gate(&self) -> &ExportGate {
        &self.gate
    }

    /// Crop, rasterize and composite without persisting.
    ///
    /// # Errors
    ///
    /// Returns the engine's error (for example [`RenderError::Tainted`]) if the
    /// region cannot be rasterized; no partial output is produced.
    pub fn compose(&self, scene: &Scene, options: &ExportOptions) -> RenderResult<Composition> {
        let resolved = BoundingBoxResolver::new(&self.engine).compute_content_rect(scene, EXPORT_BLEED);
        let rect = validate_rect(resolved, scene);

        let region = self.engine.rasterize_region(scene, rect, 1.0)?;

        let margin = options.margin;
        let pad = margin
            .checked_mul(2)
            .ok_or_else(|| RenderError::Export(format!("margin {margin} too large")))?;
        let width = rect
            .width
            .checked_add(pad)
            .ok_or_else(|| RenderError::Export("output width overflows".to_string()))?;
        let height = rect
            .height
            .checked_add(pad)
            .ok_or_else(|| RenderError::Export("output height overflows".to_string()))?;

        let fill = if options.transparent {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba(options.background.to_array())
        };
        let mut image = RgbaImage::from_pixel(width, height, fill);
        image::imageops::overlay(&mut image, &region, i64::from(margin), i64::from(margin));

        Ok(Composition { rect, image })
    }

    /// Export with a filename stamped at the current local time.
    ///
    /// # Errors
    ///
    /// See [`Compositor::export_at`].
    pub fn export(&self, scene: &Scene, options: &ExportOptions) -> RenderResult<ExportReport> {
        self.export_at(scene, options, Local::now().naive_local())
    }

    /// Export with a filename stamped at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ExportInProgress`] if another export is running,
    /// a rasterization or encoding error, or the final persistence failure
    /// (such as [`RenderError::PopupBlocked`]).
    pub fn export_at(
        &self,
        scene: &Scene,
        options: &ExportOptions,
        at: NaiveDateTime,
    ) -> RenderResult<ExportReport> {
        let _permit = self.gate.try_acquire()?;
        let filename = dated_filename(&options.prefix, at);

        let composition = self.compose(scene, options).inspect_err(|e| {
            tracing::warn!(error = %e, "export aborted before encoding");
        })?;
        let png = encode_png(&composition.image)?;
        let via = persist_with_fallback(&self.host, &self.strategies, &png, &filename)?;

        let report = ExportReport {
            filename,
            rect: composition.rect,
            width: composition.image.width(),
            height: composition.image.height(),
            bytes: png.len(),
            via,
        };
        tracing::info!(
            filename = %report.filename,
            width = report.width,
            height = report.height,
            ?via,
            "export complete"
        );
        Ok(report)
    }
}

impl<E, H> std::fmt::Debug for Compositor<E, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("strategies", &self.strategies.len())
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Use the canvas when the resolved rect has no area.
fn validate_rect(rect: PixelRect, scene: &Scene) -> PixelRect {
    if rect.width > 0 && rect.height > 0 {
        return rect;
    }
    tracing::warn!(?rect, "invalid export rect, falling back to the canvas");
    PixelRect {
        x: 0,
        y: 0,
        width: scene.canvas_width().max(1),
        height: scene.canvas_height().max(1),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use sheet_core::{Rect, VisualNode};

    use super::*;
    use crate::backend::RectOptions;

    /// Engine painting every region opaque red and reporting one fixed rect.
    struct SolidEngine {
        rect: Option<Rect>,
        fail: bool,
        calls: Cell<u32>,
    }

    impl RenderEngine for SolidEngine {
        fn node_effective_rect(&self, _node: &VisualNode, _options: RectOptions) -> Option<Rect> {
            self.rect
        }

        fn rasterize_region(
            &self,
            _scene: &Scene,
            region: PixelRect,
            pixel_ratio: f64,
        ) -> RenderResult<RgbaImage> {
            assert!((pixel_ratio - 1.0).abs() < f64::EPSILON);
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(RenderError::Tainted);
            }
            Ok(RgbaImage::from_pixel(region.width, region.height, Rgba([255, 0, 0, 255])))
        }
    }

    struct NullHost;

    impl PersistHost for NullHost {
        fn create_blob(&self, _png: &[u8]) -> RenderResult<String> {
            Ok("blob:0".to_string())
        }
        fn revoke_blob(&self, _url: &str) {}
        fn can_download(&self) -> bool {
            true
        }
        fn download(&self, _url: &str, _filename: &str) -> RenderResult<()> {
            Ok(())
        }
        fn open_view(&self, _url: &str) -> bool {
            true
        }
    }

    fn scene_with_node() -> Scene {
        let mut scene = Scene::new(400, 300);
        scene.add(VisualNode::new(sheet_core::NodeContent::Text(
            sheet_core::TextContent::new("x"),
        )));
        scene
    }

    fn engine(rect: Option<Rect>) -> SolidEngine {
        SolidEngine {
            rect,
            fail: false,
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_margin_and_background() {
        let compositor = Compositor::new(engine(Some(Rect::new(50.0, 50.0, 100.0, 40.0))), NullHost);
        let options = ExportOptions {
            margin: 10,
            background: Color::rgb(0, 0, 255),
            ..ExportOptions::default()
        };
        let out = compositor.compose(&scene_with_node(), &options).expect("compose");

        assert_eq!(
            out.rect,
            PixelRect {
                x: 34,
                y: 34,
                width: 132,
                height: 72
            }
        );
        assert_eq!(out.image.dimensions(), (152, 92));
        assert_eq!(out.image.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(out.image.get_pixel(151, 91).0, [0, 0, 255, 255]);
        assert_eq!(out.image.get_pixel(10, 10).0, [255, 0, 0, 255]);
        assert_eq!(out.image.get_pixel(9, 10).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_transparent_margin() {
        let compositor = Compositor::new(engine(Some(Rect::new(0.0, 0.0, 10.0, 10.0))), NullHost);
        let options = ExportOptions {
            margin: 5,
            transparent: true,
            ..ExportOptions::default()
        };
        let out = compositor.compose(&scene_with_node(), &options).expect("compose");
        assert_eq!(out.image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_engine_error_aborts() {
        let mut failing = engine(None);
        failing.fail = true;
        let compositor = Compositor::new(failing, NullHost);
        let err = compositor
            .export(&scene_with_node(), &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::Tainted));
        assert!(!compositor.gate().is_busy());
    }

    #[test]
    fn test_report_and_filename() {
        let compositor = Compositor::new(engine(Some(Rect::new(0.0, 0.0, 20.0, 20.0))), NullHost);
        let at = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .expect("date");
        let report = compositor
            .export_at(&scene_with_node(), &ExportOptions::default(), at)
            .expect("export");
        assert_eq!(report.filename, "display_2025-01-02_030405.png");
        assert_eq!((report.width, report.height), (52, 52));
        assert_eq!(report.via, PersistedVia::BlobDownload);
        assert_eq!(compositor.engine().calls.get(), 1);
    }

    #[test]
    fn test_gate_rejects_second_export() {
        let gate = ExportGate::new();
        let permit = gate.try_acquire().expect("first");
        assert!(matches!(gate.try_acquire(), Err(RenderError::ExportInProgress)));
        drop(permit);
        assert!(gate.try_acquire().is_ok());
    }

    #[test]
    fn test_validate_rect_falls_back() {
        let scene = Scene::new(640, 480);
        let degenerate = PixelRect {
            x: 3,
            y: 3,
            width: 0,
            height: 5,
        };
        assert_eq!(
            validate_rect(degenerate, &scene),
            PixelRect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }
}
