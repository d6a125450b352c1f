//! Radar chart rendering.
//!
//! Chart nodes hold a [`ChartConfig`]; the engine turns it into a
//! [`ChartRequest`] (labels padded to the minimum, hidden datasets dropped,
//! range normalized) and hands it to a [`ChartRenderer`].

use image::RgbaImage;
use sheet_core::{ChartConfig, ChartRequest};

use crate::error::{RenderError, RenderResult};

/// Width and height of a chart raster.
pub const CHART_SIZE: u32 = 800;

/// Turns chart requests into rasters.
pub trait ChartRenderer: Send + Sync {
    /// Render the request to an RGBA raster of [`CHART_SIZE`] square.
    ///
    /// # Errors
    ///
    /// Returns an error if no charting capability is available or drawing fails.
    fn render(&self, request: &ChartRequest) -> RenderResult<RgbaImage>;

    /// Render a chart node's configuration.
    ///
    /// # Errors
    ///
    /// See [`ChartRenderer::render`].
    fn render_config(&self, config: &ChartConfig) -> RenderResult<RgbaImage> {
        self.render(&config.render_request())
    }
}

/// Stand-in used when the `charts` feature is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableChartRenderer;

impl ChartRenderer for UnavailableChartRenderer {
    fn render(&self, _request: &ChartRequest) -> RenderResult<RgbaImage> {
        Err(RenderError::ChartUnavailable)
    }
}

/// The chart renderer for this build.
#[must_use]
pub fn default_chart_renderer() -> Box<dyn ChartRenderer> {
    #[cfg(feature = "charts")]
    {
        Box::new(radar::RadarChartRenderer::default())
    }
    #[cfg(not(feature = "charts"))]
    {
        Box::new(UnavailableChartRenderer)
    }
}

/// Spacing between radial ticks.
#[must_use]
pub fn tick_step(min: f64, max: f64) -> f64 {
    ((max - min) / 5.0).max(1.0).ceil()
}

/// Upper bound on grid rings per chart.
const MAX_TICKS: usize = 16;

/// Tick values from `min` to `max` inclusive, spaced by [`tick_step`].
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn ticks(min: f64, max: f64) -> Vec<f64> {
    let step = tick_step(min, max);
    let span = max - min;
    if !(span.is_finite() && span > 0.0 && step.is_finite()) {
        return vec![min];
    }
    let count = ((span / step).floor() as usize).min(MAX_TICKS);
    (0..=count).map(|k| min + k as f64 * step).collect()
}

#[cfg(feature = "charts")]
pub use radar::RadarChartRenderer;

#[cfg(feature = "charts")]
mod radar {
    use std::f64::consts::{PI, TAU};

    use image::RgbaImage;
    use plotters::prelude::*;
    use sheet_core::{normalize_range, ChartRequest, Color as SheetColor};

    use super::{ticks, ChartRenderer, CHART_SIZE};
    use crate::error::{RenderError, RenderResult};

    const LINE_WIDTH: u32 = 4;
    const POINT_RADIUS: i32 = 3;
    const GRID: RGBColor = RGBColor(210, 214, 220);
    const INK: RGBColor = RGBColor(55, 65, 81);

    fn chart_err(e: impl std::fmt::Display) -> RenderError {
        RenderError::Chart(e.to_string())
    }

    fn rgb(color: SheetColor) -> RGBColor {
        RGBColor(color.r, color.g, color.b)
    }

    /// Radar chart drawn with plotters on a white square.
    #[derive(Debug, Clone)]
    pub struct RadarChartRenderer {
        size: u32,
        font_family: String,
    }

    impl Default for RadarChartRenderer {
        fn default() -> Self {
            Self {
                size: CHART_SIZE,
                font_family: "sans-serif".to_string(),
            }
        }
    }

    struct Geometry {
        cx: f64,
        cy: f64,
        radius: f64,
        count: usize,
        min: f64,
        max: f64,
    }

    impl Geometry {
        fn angle(&self, index: usize) -> f64 {
            #[allow(clippy::cast_precision_loss)]
            let share = index as f64 / self.count as f64;
            -PI / 2.0 + TAU * share
        }

        #[allow(clippy::cast_possible_truncation)]
        fn point(&self, index: usize, value: f64) -> (i32, i32) {
            let span = self.max - self.min;
            let r = if span.is_finite() && span > 0.0 && value.is_finite() {
                (value.clamp(self.min, self.max) - self.min) / span * self.radius
            } else {
                0.0
            };
            let (sin, cos) = self.angle(index).sin_cos();
            (
                (self.cx + r * cos).round() as i32,
                (self.cy + r * sin).round() as i32,
            )
        }
    }

    impl RadarChartRenderer {
        /// Renderer producing `size` square rasters.
        #[must_use]
        pub fn with_size(size: u32) -> Self {
            Self {
                size: size.max(100),
                ..Self::default()
            }
        }

        fn text<DB: DrawingBackend>(
            &self,
            area: &DrawingArea<DB, plotters::coord::Shift>,
            label: &str,
            at: (i32, i32),
            px: u32,
        ) {
            let style = (self.font_family.as_str(), px).into_font().color(&INK);
            if let Err(e) = area.draw(&Text::new(label.to_string(), at, style)) {
                tracing::warn!(error = %e, label, "chart text skipped");
            }
        }
    }

    impl ChartRenderer for RadarChartRenderer {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            clippy::cast_precision_loss
        )]
        fn render(&self, request: &ChartRequest) -> RenderResult<RgbaImage> {
            let size = self.size;
            let mut buf = vec![255u8; (size as usize) * (size as usize) * 3];
            let edge = f64::from(size);
            let (min, max) = normalize_range(request.min, request.max);
            let geo = Geometry {
                cx: edge / 2.0,
                cy: edge / 2.0 + edge * 0.04,
                radius: edge * 0.34,
                count: request.labels.len().max(1),
                min,
                max,
            };

            {
                let root = BitMapBackend::with_buffer(&mut buf, (size, size)).into_drawing_area();
                root.fill(&WHITE).map_err(chart_err)?;

                // concentric grid polygons at each tick
                for tick in ticks(geo.min, geo.max) {
                    let ring: Vec<(i32, i32)> = (0..=geo.count)
                        .map(|i| geo.point(i % geo.count, tick))
                        .collect();
                    root.draw(&PathElement::new(ring, GRID.stroke_width(1)))
                        .map_err(chart_err)?;
                    let (tx, ty) = geo.point(0, tick);
                    self.text(&root, &format!("{tick}"), (tx + 6, ty - 8), 14);
                }

                for (i, label) in request.labels.iter().enumerate() {
                    let center = (geo.cx.round() as i32, geo.cy.round() as i32);
                    let outer = geo.point(i, geo.max);
                    root.draw(&PathElement::new(vec![center, outer], GRID.stroke_width(1)))
                        .map_err(chart_err)?;

                    let (sin, cos) = geo.angle(i).sin_cos();
                    let lx = geo.cx + (geo.radius + 28.0) * cos - 6.0 * label.len() as f64;
                    let ly = geo.cy + (geo.radius + 28.0) * sin - 10.0;
                    self.text(&root, label, (lx as i32, ly as i32), 20);
                }

                for (slot, dataset) in request.datasets.iter().enumerate() {
                    let points: Vec<(i32, i32)> = dataset
                        .series
                        .iter()
                        .enumerate()
                        .map(|(i, v)| geo.point(i, *v))
                        .collect();
                    if points.is_empty() {
                        continue;
                    }

                    let fill = dataset.fill_rgba();
                    let fill_style = rgb(fill).mix(f64::from(fill.alpha_f32())).filled();
                    root.draw(&Polygon::new(points.clone(), fill_style))
                        .map_err(chart_err)?;

                    let line = rgb(dataset.line_color);
                    let mut outline = points.clone();
                    outline.push(points[0]);
                    root.draw(&PathElement::new(outline, line.stroke_width(LINE_WIDTH)))
                        .map_err(chart_err)?;

                    if dataset.show_points {
                        for p in &points {
                            root.draw(&Circle::new(*p, POINT_RADIUS, line.filled()))
                                .map_err(chart_err)?;
                        }
                    }

                    // legend entry
                    let row = 24 + 28 * slot as i32;
                    root.draw(&Rectangle::new([(24, row), (48, row + 16)], line.filled()))
                        .map_err(chart_err)?;
                    self.text(&root, &dataset.label, (56, row - 2), 18);
                }

                root.present().map_err(chart_err)?;
            }

            let mut rgba = Vec::with_capacity(buf.len() / 3 * 4);
            for px in buf.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            tracing::debug!(
                labels = request.labels.len(),
                datasets = request.datasets.len(),
                "radar chart rendered"
            );
            RgbaImage::from_raw(size, size, rgba)
                .ok_or_else(|| RenderError::Chart("chart buffer size mismatch".to_string()))
        }
    }
}
