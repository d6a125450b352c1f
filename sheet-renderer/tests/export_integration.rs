//! End-to-end export tests: document in, PNG file out.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use image::RgbaImage;
use sheet_core::{
    BackgroundFit, Bitmap, ChartForm, ChartRequest, Dataset, Document, ImageFilters,
    PatternConfig, PixelRect, Shadow, ShapeKind, TextContent, Transform,
};
use sheet_renderer::{
    BoundingBoxResolver, ChartRenderer, Compositor, DirectoryHost, ExportOptions, PersistedVia,
    RenderEngine, RenderError, RenderResult, SoftwareEngine, EXPORT_BLEED,
};
use tempfile::TempDir;

fn fixed_time() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 30)
        .and_then(|d| d.and_hms_opt(18, 45, 9))
        .expect("valid time")
}

fn small_pattern() -> PatternConfig {
    PatternConfig {
        shape_kind: ShapeKind::Dots,
        seed: 1,
        canvas_size: 200,
        density: 4.0,
        ..PatternConfig::default()
    }
}

/// Chart renderer that remembers the label count of every request.
#[derive(Clone, Default)]
struct RecordingCharts {
    label_counts: Arc<Mutex<Vec<usize>>>,
}

impl ChartRenderer for RecordingCharts {
    fn render(&self, request: &ChartRequest) -> RenderResult<RgbaImage> {
        self.label_counts
            .lock()
            .expect("lock")
            .push(request.labels.len());
        Ok(RgbaImage::from_pixel(8, 8, image::Rgba([0, 128, 0, 255])))
    }
}

// ==========================================================================
// Full pipeline
// ==========================================================================

#[test]
fn test_text_and_pattern_export_with_margin() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = Document::new(1600, 1200);
    doc.add_text(TextContent::new("Hello"));
    doc.add_pattern(small_pattern());

    let compositor = Compositor::new(SoftwareEngine::new(), DirectoryHost::new(dir.path()));
    let options = ExportOptions {
        margin: 10,
        ..ExportOptions::default()
    };
    let report = compositor
        .export_at(doc.scene(), &options, fixed_time())
        .expect("export");

    assert_eq!(report.filename, "display_2024-11-30_184509.png");
    assert_eq!(report.via, PersistedVia::BlobDownload);
    assert_eq!(report.width, report.rect.width + 20);
    assert_eq!(report.height, report.rect.height + 20);
    // Pattern at (120, 120) is 200 square; 16 px of bleed on each side.
    assert!(report.rect.x <= 104 && report.rect.y <= 104);
    assert!(report.rect.width >= 232);

    let written = image::open(dir.path().join(&report.filename))
        .expect("exported file")
        .to_rgba8();
    assert_eq!(written.dimensions(), (report.width, report.height));
    for (x, y) in [
        (0, 0),
        (report.width - 1, 0),
        (0, report.height - 1),
        (report.width - 1, report.height - 1),
    ] {
        assert_eq!(written.get_pixel(x, y).0, [255, 255, 255, 255], "corner {x},{y}");
    }
    assert_eq!(compositor.host().live_blobs(), 0);

    let json = serde_json::to_value(&report).expect("report json");
    assert_eq!(json["via"], "blob_download");
    assert_eq!(json["width"], report.width);
}

#[test]
fn test_custom_prefix_and_transparent_margin() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = Document::new(800, 600);
    doc.add_pattern(PatternConfig {
        transparent: true,
        ..small_pattern()
    });

    let compositor = Compositor::new(SoftwareEngine::new(), DirectoryHost::new(dir.path()));
    let options = ExportOptions {
        margin: 4,
        transparent: true,
        prefix: "  poster ".to_string(),
        ..ExportOptions::default()
    };
    let report = compositor
        .export_at(doc.scene(), &options, fixed_time())
        .expect("export");

    assert_eq!(report.filename, "poster_2024-11-30_184509.png");
    let written = image::open(dir.path().join(&report.filename))
        .expect("exported file")
        .to_rgba8();
    assert_eq!(written.get_pixel(0, 0).0[3], 0);
}

#[test]
fn test_hidden_nodes_are_not_exported() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = Document::new(640, 480);
    let far = doc.add_pattern(small_pattern());
    doc.set_transform(far, sheet_core::Transform::at(5000.0, 5000.0));
    doc.set_visible(far, false);

    let compositor = Compositor::new(SoftwareEngine::new(), DirectoryHost::new(dir.path()));
    let report = compositor
        .export_at(doc.scene(), &ExportOptions::default(), fixed_time())
        .expect("export");

    // Nothing visible: the whole canvas plus bleed.
    assert_eq!((report.width, report.height), (672, 512));
}

// ==========================================================================
// Crop against painted pixels
// ==========================================================================

#[test]
fn test_crop_contains_every_painted_pixel() {
    let mut doc = Document::new(1200, 900);

    let mut wide = TextContent::new("WWWWWWWWWW");
    wide.font_family = "DejaVu Sans".to_string();
    let title = doc.add_text(wide);
    doc.set_transform(title, Transform::at(100.0, 100.0));

    let tile = doc.add_pattern(small_pattern());
    let mut turned = Transform::at(700.0, 450.0);
    turned.rotation = 30.0;
    turned.scale_x = 1.5;
    doc.set_transform(tile, turned);

    let mut caption = TextContent::new("Mid\\nline");
    caption.stroke_width = 6.0;
    let caption = doc.add_text(caption);
    doc.set_transform(caption, Transform::at(300.0, 600.0));
    assert!(doc.select(caption));
    doc.apply_effects(
        Shadow {
            blur: 12.0,
            offset_x: 20.0,
            offset_y: 25.0,
            opacity: 0.8,
            enabled: true,
            ..Shadow::default()
        },
        ImageFilters::default(),
    )
    .expect("effects");

    let engine = SoftwareEngine::new();
    let scene = doc.scene();
    let canvas = PixelRect {
        x: 0,
        y: 0,
        width: scene.canvas_width(),
        height: scene.canvas_height(),
    };
    let full = engine.rasterize_region(scene, canvas, 1.0).expect("raster");
    let crop = BoundingBoxResolver::new(&engine).compute_content_rect(scene, EXPORT_BLEED);

    let mut inked = 0usize;
    for (x, y, pixel) in full.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        inked += 1;
        let (x, y) = (i64::from(x), i64::from(y));
        assert!(
            x >= crop.x
                && y >= crop.y
                && x < crop.x + i64::from(crop.width)
                && y < crop.y + i64::from(crop.height),
            "painted pixel {x},{y} outside crop {crop:?}"
        );
    }
    assert!(inked > 0);
}

// ==========================================================================
// Charts
// ==========================================================================

#[cfg(feature = "charts")]
#[test]
fn test_chart_with_huge_equal_bounds_exports() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = Document::new(1600, 1200);
    doc.add_chart(ChartForm {
        labels: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        min: 1e17,
        max: 1e17,
        dataset: Dataset::new("Set 1", vec![1e17; 3]),
    });

    let compositor = Compositor::new(SoftwareEngine::new(), DirectoryHost::new(dir.path()));
    let report = compositor
        .export_at(doc.scene(), &ExportOptions::default(), fixed_time())
        .expect("export");
    assert!(dir.path().join(&report.filename).exists());
}

#[test]
fn test_chart_with_two_labels_is_padded() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = Document::new(1600, 1200);
    doc.add_chart(ChartForm {
        labels: vec!["A".to_string(), "B".to_string()],
        min: 0.0,
        max: 10.0,
        dataset: Dataset::new("Set 1", vec![3.0, 7.0]),
    });

    let charts = RecordingCharts::default();
    let engine = SoftwareEngine::with_chart_renderer(Box::new(charts.clone()));
    let compositor = Compositor::new(engine, DirectoryHost::new(dir.path()));
    compositor
        .export_at(doc.scene(), &ExportOptions::default(), fixed_time())
        .expect("export");

    let counts = charts.label_counts.lock().expect("lock");
    assert!(!counts.is_empty());
    assert!(counts.iter().all(|&n| n >= 3));
}

// ==========================================================================
// Failure paths
// ==========================================================================

#[test]
fn test_cross_origin_background_aborts_export() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = Document::new(400, 300);
    let bitmap = Bitmap::from_rgba(2, 2, vec![255; 16]).expect("bitmap");
    doc.set_background(bitmap, BackgroundFit::Contain, false);
    doc.add_text(TextContent::new("on top"));

    let compositor = Compositor::new(SoftwareEngine::new(), DirectoryHost::new(dir.path()));
    let err = compositor
        .export_at(doc.scene(), &ExportOptions::default(), fixed_time())
        .unwrap_err();

    assert!(matches!(err, RenderError::Tainted));
    let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
    assert_eq!(leftovers, 0);
    assert!(!compositor.gate().is_busy());
}

#[test]
fn test_missing_directory_falls_through_to_popup_blocked() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = Document::new(400, 300);
    doc.add_pattern(small_pattern());

    let missing = dir.path().join("does-not-exist");
    let compositor = Compositor::new(SoftwareEngine::new(), DirectoryHost::new(&missing));
    let err = compositor
        .export_at(doc.scene(), &ExportOptions::default(), fixed_time())
        .unwrap_err();

    assert!(matches!(err, RenderError::PopupBlocked));
    assert!(!missing.exists());
}
