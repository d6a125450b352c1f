//! Radar chart configuration and its dataset collection.
//!
//! Every mutation keeps each dataset's series the same length as the
//! label list: longer series are truncated, shorter ones zero-padded.

use serde::{Deserialize, Serialize};

use crate::{Color, SheetError, SheetResult};

/// Radial scales need at least this many spokes.
pub const MIN_CHART_LABELS: usize = 3;

/// Fill alpha used when none is given.
pub const DEFAULT_FILL_ALPHA: f64 = 0.25;

/// Resize `series` to `len` by truncation or zero padding.
pub fn reconcile(series: &mut Vec<f64>, len: usize) {
    series.resize(len, 0.0);
}

/// One series on a radar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    /// Legend label.
    pub label: String,
    /// One value per chart label.
    pub series: Vec<f64>,
    /// Outline color.
    pub line_color: Color,
    /// Area color; drawn with `fill_alpha`.
    pub fill_color: Color,
    /// Fill opacity in `[0, 1]`.
    pub fill_alpha: f64,
    /// Draw a marker on each vertex.
    pub show_points: bool,
    /// Hidden datasets stay in the list but are not drawn.
    pub visible: bool,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            label: "Data".to_string(),
            series: Vec::new(),
            line_color: Color::rgb(0x0e, 0xa5, 0xe9),
            fill_color: Color::rgb(0x0e, 0xa5, 0xe9),
            fill_alpha: DEFAULT_FILL_ALPHA,
            show_points: true,
            visible: true,
        }
    }
}

impl Dataset {
    /// Create a visible dataset with default styling.
    #[must_use]
    pub fn new(label: &str, series: Vec<f64>) -> Self {
        let label = label.trim();
        Self {
            label: if label.is_empty() {
                Self::default().label
            } else {
                label.to_string()
            },
            series,
            ..Self::default()
        }
    }

    /// Area color with `fill_alpha` applied.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn fill_rgba(&self) -> Color {
        self.fill_color.with_alpha(self.fill_alpha as f32)
    }
}

/// Ordered datasets plus the list's selected entry.
///
/// The selection is cleared on any insert or removal so it never points
/// at a slot that now holds a different dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetStore {
    datasets: Vec<Dataset>,
    selected: Option<usize>,
}

impl DatasetStore {
    /// All datasets in order.
    #[must_use]
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Number of datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether there are no datasets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Currently selected dataset index.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Select a dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn select(&mut self, index: usize) -> SheetResult<()> {
        self.check(index)?;
        self.selected = Some(index);
        Ok(())
    }

    /// Append a dataset, reconciled to `label_count`. Returns its index.
    pub fn add(&mut self, mut dataset: Dataset, label_count: usize) -> usize {
        reconcile(&mut dataset.series, label_count);
        self.datasets.push(dataset);
        self.selected = None;
        self.datasets.len() - 1
    }

    /// Remove a dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> SheetResult<Dataset> {
        self.check(index)?;
        self.selected = None;
        Ok(self.datasets.remove(index))
    }

    /// Remove the selected dataset, if any.
    pub fn remove_selected(&mut self) -> Option<Dataset> {
        let index = self.selected.take()?;
        (index < self.datasets.len()).then(|| self.datasets.remove(index))
    }

    /// Flip a dataset's visibility. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn toggle_visible(&mut self, index: usize) -> SheetResult<bool> {
        self.check(index)?;
        let ds = &mut self.datasets[index];
        ds.visible = !ds.visible;
        Ok(ds.visible)
    }

    /// Reconcile every series to `label_count`.
    pub fn reconcile_all(&mut self, label_count: usize) {
        for ds in &mut self.datasets {
            reconcile(&mut ds.series, label_count);
        }
    }

    fn check(&self, index: usize) -> SheetResult<()> {
        if index < self.datasets.len() {
            Ok(())
        } else {
            Err(SheetError::DatasetIndexOutOfRange {
                index,
                len: self.datasets.len(),
            })
        }
    }
}

/// Content of a chart node.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    labels: Vec<String>,
    /// Lower end of the radial scale.
    pub min: f64,
    /// Upper end of the radial scale.
    pub max: f64,
    datasets: DatasetStore,
}

impl ChartConfig {
    /// Create a chart with one initial dataset.
    #[must_use]
    pub fn new(labels: Vec<String>, min: f64, max: f64, first: Dataset) -> Self {
        let mut cfg = Self {
            labels,
            min,
            max,
            datasets: DatasetStore::default(),
        };
        cfg.add_dataset(first);
        cfg
    }

    /// Axis labels in order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Dataset collection.
    #[must_use]
    pub fn datasets(&self) -> &DatasetStore {
        &self.datasets
    }

    /// Append a dataset. Returns its index.
    pub fn add_dataset(&mut self, dataset: Dataset) -> usize {
        let index = self.datasets.add(dataset, self.labels.len());
        tracing::debug!(index, "dataset added");
        index
    }

    /// Remove a dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn remove_dataset(&mut self, index: usize) -> SheetResult<Dataset> {
        let removed = self.datasets.remove(index)?;
        tracing::debug!(index, "dataset removed");
        Ok(removed)
    }

    /// Remove the selected dataset, if any.
    pub fn remove_selected_dataset(&mut self) -> Option<Dataset> {
        self.datasets.remove_selected()
    }

    /// Select a dataset for later removal.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn select_dataset(&mut self, index: usize) -> SheetResult<()> {
        self.datasets.select(index)
    }

    /// Flip a dataset's visibility.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn toggle_visible(&mut self, index: usize) -> SheetResult<bool> {
        self.datasets.toggle_visible(index)
    }

    /// Replace labels and range, reconciling every series.
    pub fn update_all(&mut self, labels: Vec<String>, min: f64, max: f64) {
        self.labels = labels;
        self.min = min;
        self.max = max;
        self.datasets.reconcile_all(self.labels.len());
    }

    /// What the charting capability is asked to draw.
    ///
    /// Labels are padded to [`MIN_CHART_LABELS`] with placeholders (series
    /// padded with zeros to match), hidden datasets are dropped and an
    /// inverted or empty range is widened to `[min, min + 1]`.
    #[must_use]
    pub fn render_request(&self) -> ChartRequest {
        let mut labels = self.labels.clone();
        if labels.len() < MIN_CHART_LABELS {
            tracing::warn!(
                supplied = labels.len(),
                "chart has fewer than {MIN_CHART_LABELS} labels, padding with placeholders"
            );
            let mut n = labels.len();
            while labels.len() < MIN_CHART_LABELS {
                n += 1;
                labels.push(format!("#{n}"));
            }
        }

        let (min, max) = normalize_range(self.min, self.max);
        let datasets = self
            .datasets
            .datasets()
            .iter()
            .filter(|d| d.visible)
            .map(|d| {
                let mut d = d.clone();
                reconcile(&mut d.series, labels.len());
                d
            })
            .collect();

        ChartRequest {
            labels,
            min,
            max,
            datasets,
        }
    }
}

/// Input to the charting capability.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    /// At least [`MIN_CHART_LABELS`] labels.
    pub labels: Vec<String>,
    /// Scale minimum, strictly below `max`.
    pub min: f64,
    /// Scale maximum.
    pub max: f64,
    /// Visible datasets only, each reconciled to `labels`.
    pub datasets: Vec<Dataset>,
}

/// Largest magnitude a chart bound may take, so `max - min` stays finite.
const RANGE_LIMIT: f64 = f64::MAX / 4.0;

/// Chart scale bounds with `min < max` and a finite span.
///
/// Non-finite bounds fall back to `0` and `100`. An empty or inverted range
/// is widened above `min` by at least one unit, or by a relative step where
/// `min + 1` would round back to `min`.
#[must_use]
pub fn normalize_range(min: f64, max: f64) -> (f64, f64) {
    let min = if min.is_finite() { min } else { 0.0 }.clamp(-RANGE_LIMIT, RANGE_LIMIT);
    let max = if max.is_finite() { max } else { 100.0 }.clamp(-RANGE_LIMIT, RANGE_LIMIT);
    if min < max {
        (min, max)
    } else {
        tracing::warn!(min, max, "chart range is empty, widening");
        (min, min + (min.abs() * 1e-9).max(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn chart() -> ChartConfig {
        ChartConfig::new(
            labels(&["A", "B", "C", "D"]),
            0.0,
            100.0,
            Dataset::new("first", vec![1.0, 2.0]),
        )
    }

    #[test]
    fn test_new_chart_reconciles_first_dataset() {
        let cfg = chart();
        assert_eq!(cfg.datasets().datasets()[0].series, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_update_all_truncates() {
        let mut cfg = chart();
        cfg.update_all(labels(&["A", "B"]), 10.0, 20.0);
        assert_eq!(cfg.datasets().datasets()[0].series, vec![1.0, 2.0]);
        assert!((cfg.min - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_selection_cleared_on_structural_change() {
        let mut cfg = chart();
        cfg.add_dataset(Dataset::new("second", vec![]));
        cfg.select_dataset(1).expect("select");
        assert_eq!(cfg.datasets().selected(), Some(1));

        cfg.add_dataset(Dataset::new("third", vec![]));
        assert_eq!(cfg.datasets().selected(), None);

        cfg.select_dataset(0).expect("select");
        cfg.remove_dataset(2).expect("remove");
        assert_eq!(cfg.datasets().selected(), None);
    }

    #[test]
    fn test_remove_selected() {
        let mut cfg = chart();
        cfg.add_dataset(Dataset::new("second", vec![]));
        assert!(cfg.remove_selected_dataset().is_none());
        cfg.select_dataset(0).expect("select");
        let removed = cfg.remove_selected_dataset().expect("removed");
        assert_eq!(removed.label, "first");
        assert_eq!(cfg.datasets().len(), 1);
    }

    #[test]
    fn test_out_of_range_index() {
        let mut cfg = chart();
        assert!(matches!(
            cfg.toggle_visible(5),
            Err(SheetError::DatasetIndexOutOfRange { index: 5, len: 1 })
        ));
        assert!(cfg.remove_dataset(1).is_err());
    }

    #[test]
    fn test_render_request_pads_labels_and_filters_hidden() {
        let mut cfg = ChartConfig::new(
            labels(&["A", "B"]),
            0.0,
            100.0,
            Dataset::new("visible", vec![5.0, 6.0]),
        );
        let hidden = cfg.add_dataset(Dataset::new("hidden", vec![1.0]));
        cfg.toggle_visible(hidden).expect("toggle");

        let req = cfg.render_request();
        assert!(req.labels.len() >= MIN_CHART_LABELS);
        assert_eq!(&req.labels[..2], &["A".to_string(), "B".to_string()]);
        assert_eq!(req.datasets.len(), 1);
        assert_eq!(req.datasets[0].series, vec![5.0, 6.0, 0.0]);
        // stored config is untouched
        assert_eq!(cfg.labels().len(), 2);
    }

    #[test]
    fn test_render_request_widens_inverted_range() {
        let mut cfg = chart();
        cfg.update_all(labels(&["A", "B", "C"]), 50.0, 10.0);
        let req = cfg.render_request();
        assert!(req.min < req.max);
        assert!((req.min - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_range_large_equal_bounds() {
        // min + 1.0 == min at this magnitude
        let (min, max) = normalize_range(1e17, 1e17);
        assert!(min < max);
        assert!((max - min).is_finite());

        let (min, max) = normalize_range(f64::MAX, f64::MAX);
        assert!(min < max);
        assert!((max - min).is_finite());

        let (min, max) = normalize_range(-f64::MAX, f64::MAX);
        assert!(min < max);
        assert!((max - min).is_finite());
    }

    #[test]
    fn test_normalize_range_non_finite() {
        assert_eq!(normalize_range(f64::NAN, f64::INFINITY), (0.0, 100.0));
        assert_eq!(normalize_range(3.0, 3.0), (3.0, 4.0));
    }

    #[test]
    fn test_blank_label_defaults() {
        assert_eq!(Dataset::new("   ", vec![]).label, "Data");
    }
}
