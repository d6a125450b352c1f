//! Boundary between editor form controls and configuration data.
//!
//! Forms are read as flat string snapshots. Reading never fails: missing
//! or malformed numeric fields fall back to their defaults.

use std::collections::BTreeMap;

use crate::dataset::{Dataset, DEFAULT_FILL_ALPHA};
use crate::pattern::{PatternConfig, ShapeKind};
use crate::Color;

/// Pattern form keys.
pub mod pattern_keys {
    /// Shape kind.
    pub const KIND: &str = "patKind";
    /// Seed.
    pub const SEED: &str = "patSeed";
    /// First color.
    pub const PRIMARY: &str = "patC1";
    /// Second color.
    pub const SECONDARY: &str = "patC2";
    /// Background color.
    pub const BACKGROUND: &str = "patBg";
    /// `"1"` for a transparent background.
    pub const TRANSPARENT: &str = "patBgTransparent";
    /// Opacity.
    pub const OPACITY: &str = "patOpacity";
    /// Rotation in degrees.
    pub const ROTATION: &str = "patRot";
    /// Shape size.
    pub const SIZE: &str = "patSize";
    /// Density.
    pub const DENSITY: &str = "patDensity";
    /// Tile edge length.
    pub const CANVAS: &str = "patCanvas";
}

/// Chart form keys.
pub mod chart_keys {
    /// Newline-separated labels.
    pub const LABELS: &str = "radarLabels";
    /// Comma-separated values.
    pub const VALUES: &str = "radarValues";
    /// Dataset name.
    pub const SET_NAME: &str = "radarSetName";
    /// Line color.
    pub const LINE: &str = "radarLine";
    /// Fill color.
    pub const FILL: &str = "radarFill";
    /// Fill alpha.
    pub const ALPHA: &str = "radarAlpha";
    /// `"1"` to draw point markers.
    pub const DOTS: &str = "radarDots";
    /// Scale minimum.
    pub const MIN: &str = "radarMin";
    /// Scale maximum.
    pub const MAX: &str = "radarMax";
}

/// A snapshot of form control values, keyed by control name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    values: BTreeMap<String, String>,
}

impl FormSnapshot {
    /// Empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a control value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Raw control value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number, or `default` when missing, unparsable, non-finite or zero.
    ///
    /// Zero counts as missing, matching how empty numeric inputs behave.
    #[must_use]
    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v != 0.0)
            .unwrap_or(default)
    }

    /// Color, or `default` when missing or malformed.
    #[must_use]
    pub fn color_or(&self, key: &str, default: Color) -> Color {
        self.get(key)
            .and_then(|v| Color::from_hex(v).ok())
            .unwrap_or(default)
    }

    /// `"1"` is true, anything else false.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.trim() == "1")
    }
}

fn flag_str(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

/// Read a pattern config from a form snapshot.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn read_pattern_config(form: &FormSnapshot) -> PatternConfig {
    use pattern_keys as k;
    let defaults = PatternConfig::default();
    let seed = form.number_or(k::SEED, 1.0);
    let canvas = form.number_or(k::CANVAS, f64::from(defaults.canvas_size));
    PatternConfig {
        shape_kind: form
            .get(k::KIND)
            .and_then(|v| v.parse::<ShapeKind>().ok())
            .unwrap_or(defaults.shape_kind),
        seed: seed.clamp(1.0, f64::from(u32::MAX)) as u32,
        primary: form.color_or(k::PRIMARY, defaults.primary),
        secondary: form.color_or(k::SECONDARY, defaults.secondary),
        background: form.color_or(k::BACKGROUND, defaults.background),
        transparent: form.flag(k::TRANSPARENT),
        opacity: form.number_or(k::OPACITY, defaults.opacity),
        rotation_degrees: form.number_or(k::ROTATION, defaults.rotation_degrees),
        shape_size: form.number_or(k::SIZE, defaults.shape_size),
        density: form.number_or(k::DENSITY, defaults.density),
        canvas_size: canvas.clamp(0.0, f64::from(u32::MAX)) as u32,
    }
    .normalized()
}

/// Write a pattern config back into form values.
#[must_use]
pub fn write_pattern_config(cfg: &PatternConfig) -> FormSnapshot {
    use pattern_keys as k;
    FormSnapshot::new()
        .with(k::KIND, cfg.shape_kind.to_string())
        .with(k::SEED, cfg.seed.to_string())
        .with(k::PRIMARY, cfg.primary.to_hex_rgb())
        .with(k::SECONDARY, cfg.secondary.to_hex_rgb())
        .with(k::BACKGROUND, cfg.background.to_hex_rgb())
        .with(k::TRANSPARENT, flag_str(cfg.transparent))
        .with(k::OPACITY, cfg.opacity.to_string())
        .with(k::ROTATION, cfg.rotation_degrees.to_string())
        .with(k::SIZE, cfg.shape_size.to_string())
        .with(k::DENSITY, cfg.density.to_string())
        .with(k::CANVAS, cfg.canvas_size.to_string())
}

/// Parsed chart form: labels, range and a candidate dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartForm {
    /// Non-empty trimmed labels.
    pub labels: Vec<String>,
    /// Scale minimum.
    pub min: f64,
    /// Scale maximum.
    pub max: f64,
    /// Dataset built from the value and style fields.
    pub dataset: Dataset,
}

/// Split on line breaks, trim, drop blanks.
#[must_use]
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Split on commas; anything that is not a finite number becomes 0.
#[must_use]
pub fn parse_values(text: &str) -> Vec<f64> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',')
        .map(|s| s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0))
        .collect()
}

/// Read the chart form.
#[must_use]
pub fn read_chart_form(form: &FormSnapshot) -> ChartForm {
    use chart_keys as k;
    let defaults = Dataset::default();
    let mut dataset = Dataset::new(
        form.get(k::SET_NAME).unwrap_or_default(),
        parse_values(form.get(k::VALUES).unwrap_or_default()),
    );
    dataset.line_color = form.color_or(k::LINE, defaults.line_color);
    dataset.fill_color = form.color_or(k::FILL, defaults.fill_color);
    dataset.fill_alpha = form.number_or(k::ALPHA, DEFAULT_FILL_ALPHA).clamp(0.0, 1.0);
    dataset.show_points = form.flag(k::DOTS);

    ChartForm {
        labels: parse_labels(form.get(k::LABELS).unwrap_or_default()),
        min: form.number_or(k::MIN, 0.0),
        max: form.number_or(k::MAX, 100.0),
        dataset,
    }
}

/// Write chart fields back into form values.
#[must_use]
pub fn write_chart_form(chart: &ChartForm) -> FormSnapshot {
    use chart_keys as k;
    let values: Vec<String> = chart.dataset.series.iter().map(ToString::to_string).collect();
    FormSnapshot::new()
        .with(k::LABELS, chart.labels.join("\n"))
        .with(k::VALUES, values.join(","))
        .with(k::SET_NAME, chart.dataset.label.clone())
        .with(k::LINE, chart.dataset.line_color.to_hex_rgb())
        .with(k::FILL, chart.dataset.fill_color.to_hex_rgb())
        .with(k::ALPHA, chart.dataset.fill_alpha.to_string())
        .with(k::DOTS, flag_str(chart.dataset.show_points))
        .with(k::MIN, chart.min.to_string())
        .with(k::MAX, chart.max.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_defaults_on_garbage() {
        let form = FormSnapshot::new()
            .with(pattern_keys::KIND, "zigzag")
            .with(pattern_keys::SEED, "abc")
            .with(pattern_keys::DENSITY, "")
            .with(pattern_keys::PRIMARY, "#zzz")
            .with(pattern_keys::TRANSPARENT, "1");
        let cfg = read_pattern_config(&form);
        assert_eq!(cfg.shape_kind, ShapeKind::Zigzag);
        assert_eq!(cfg.seed, 1);
        assert!((cfg.density - 18.0).abs() < f64::EPSILON);
        assert_eq!(cfg.primary, PatternConfig::default().primary);
        assert!(cfg.transparent);
    }

    #[test]
    fn test_pattern_write_then_read() {
        let cfg = PatternConfig {
            shape_kind: ShapeKind::Rings,
            seed: 4242,
            rotation_degrees: 30.0,
            ..PatternConfig::default()
        };
        assert_eq!(read_pattern_config(&write_pattern_config(&cfg)), cfg);
    }

    #[test]
    fn test_parse_labels_and_values() {
        assert_eq!(parse_labels(" A \r\n\nB\n  C"), vec!["A", "B", "C"]);
        assert_eq!(parse_values("1, x,3.5,"), vec![1.0, 0.0, 3.5, 0.0]);
        assert!(parse_values("  ").is_empty());
    }

    #[test]
    fn test_chart_form_defaults() {
        let form = FormSnapshot::new()
            .with(chart_keys::LABELS, "Speed\nPower\nRange")
            .with(chart_keys::VALUES, "10,20")
            .with(chart_keys::ALPHA, "nope")
            .with(chart_keys::DOTS, "1");
        let chart = read_chart_form(&form);
        assert_eq!(chart.labels.len(), 3);
        assert!((chart.min - 0.0).abs() < f64::EPSILON);
        assert!((chart.max - 100.0).abs() < f64::EPSILON);
        assert!((chart.dataset.fill_alpha - DEFAULT_FILL_ALPHA).abs() < f64::EPSILON);
        assert_eq!(chart.dataset.label, "Data");
        assert!(chart.dataset.show_points);
        assert_eq!(chart.dataset.series, vec![10.0, 20.0]);
    }
}
