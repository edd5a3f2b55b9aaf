//! This module turns a raw DataFrame into the grouped statistics a
//! categorical chart draws.
//!
//! The requested x, y and hue columns are validated against the table, rows
//! with a missing key or value are dropped, and the y column is reduced to a
//! mean and a 95% confidence interval for every (x, hue) group. Category and
//! series order follow the data: numeric keys ascend, other keys keep the
//! order in which they first appear.

use crate::config::{PlotKind, PlotRequest};
use crate::error::AppError;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Two-sided 95% quantile of the standard normal distribution.
pub const Z_95: f64 = 1.959_963_984_540_054;

const MEAN_COL: &str = "__catplot_mean";
const STD_COL: &str = "__catplot_std";
const COUNT_COL: &str = "__catplot_count";

/// Fraction of a category's width covered by its bars.
const GROUP_WIDTH: f64 = 0.8;

/// The aggregated value of one (x, hue) group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub mean: f64,
    /// Lower and upper bound of the 95% confidence interval, when `count > 1`.
    pub ci: Option<(f64, f64)>,
    pub count: usize,
}

/// One coloured series: a hue level, or the whole table when there is no hue.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    /// The hue value, `None` when the plot has no hue.
    pub label: Option<String>,
    /// One entry per category; `None` where the group has no rows.
    pub values: Vec<Option<Estimate>>,
}

/// Everything the plotter needs to draw a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalPlot {
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<SeriesData>,
}

/// A single bar or point, positioned in category units (category `i` is
/// centred on `i`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    pub series: usize,
    pub category: usize,
    pub center: f64,
    pub width: f64,
    pub estimate: Estimate,
}

impl CategoricalPlot {
    pub fn has_hue(&self) -> bool {
        self.series.iter().any(|s| s.label.is_some())
    }

    /// The legend labels, one per hue level. Empty without a hue.
    pub fn legend_entries(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter_map(|s| s.label.as_deref())
            .collect()
    }

    /// Positions every non-empty group for the given primitive.
    ///
    /// Bars are dodged inside their category; points sit on the category
    /// centre so that a series can be joined by a line.
    pub fn marks(&self, kind: PlotKind) -> Vec<Mark> {
        let n_series = self.series.len().max(1) as f64;
        let bar_width = GROUP_WIDTH / n_series;
        let mut marks = Vec::new();
        for (si, series) in self.series.iter().enumerate() {
            for (ci, value) in series.values.iter().enumerate() {
                let Some(estimate) = value else { continue };
                let (center, width) = match kind {
                    PlotKind::Bar => (
                        ci as f64 - GROUP_WIDTH / 2.0 + (si as f64 + 0.5) * bar_width,
                        bar_width,
                    ),
                    PlotKind::Point => (ci as f64, 0.0),
                };
                marks.push(Mark {
                    series: si,
                    category: ci,
                    center,
                    width,
                    estimate: *estimate,
                });
            }
        }
        marks
    }

    /// The y range covering every mean, and every interval when `with_ci`.
    /// Bars always include zero. The range is padded by 5% on each side.
    pub fn value_range(&self, kind: PlotKind, with_ci: bool) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for estimate in self.series.iter().flat_map(|s| s.values.iter().flatten()) {
            let (low, high) = match estimate.ci {
                Some(ci) if with_ci => ci,
                _ => (estimate.mean, estimate.mean),
            };
            lo = lo.min(low);
            hi = hi.max(high);
        }
        if kind == PlotKind::Bar {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        let span = if hi > lo { hi - lo } else { hi.abs().max(1.0) };
        let pad = span * 0.05;
        let lo = if kind == PlotKind::Bar && lo == 0.0 { 0.0 } else { lo - pad };
        let hi = if kind == PlotKind::Bar && hi == 0.0 { 0.0 } else { hi + pad };
        (lo, hi)
    }
}

/// Validates the requested columns and computes the per-group statistics.
pub fn prepare_plot_data(df: &DataFrame, request: &PlotRequest) -> Result<CategoricalPlot, AppError> {
    let x = request.x.as_str();
    let y = request.y.as_str();
    let hue = request.hue.as_deref();

    for name in [Some(x), Some(y), hue].into_iter().flatten() {
        df.column(name)
            .map_err(|_| AppError::ColumnNotFound(name.to_string()))?;
    }
    if !df.column(y)?.dtype().is_numeric() {
        return Err(AppError::NonNumericColumn(y.to_string()));
    }

    let grouped = aggregate(df, x, hue, y)?;
    if grouped.height() == 0 {
        return Err(AppError::EmptyData);
    }
    debug!("  -> {} groups after aggregation", grouped.height());

    let x_keys = key_labels(grouped.column(x)?)?;
    let categories = level_order(grouped.column(x)?, &x_keys)?;
    let (hue_keys, levels) = match hue {
        Some(h) => {
            let keys = key_labels(grouped.column(h)?)?;
            let levels = level_order(grouped.column(h)?, &keys)?;
            (Some(keys), Some(levels))
        }
        None => (None, None),
    };

    let estimates = estimates(&grouped)?;

    let mut by_group: HashMap<(&str, Option<&str>), Estimate> = HashMap::new();
    for (i, estimate) in estimates.into_iter().enumerate() {
        let Some(estimate) = estimate else { continue };
        let hue_key = hue_keys.as_ref().map(|keys| keys[i].as_str());
        by_group.insert((x_keys[i].as_str(), hue_key), estimate);
    }

    let series_for = |label: Option<&str>| SeriesData {
        label: label.map(str::to_string),
        values: categories
            .iter()
            .map(|c| by_group.get(&(c.as_str(), label)).copied())
            .collect(),
    };
    let series = match &levels {
        Some(levels) => levels.iter().map(|l| series_for(Some(l.as_str()))).collect(),
        None => vec![series_for(None)],
    };

    debug!(
        "  -> {} categories of '{}', {} series",
        categories.len(),
        x,
        levels.as_ref().map_or(1, Vec::len)
    );

    Ok(CategoricalPlot {
        x_label: x.to_string(),
        y_label: y.to_string(),
        categories,
        series,
    })
}

/// Groups by x (and hue) in order of first appearance and reduces y to
/// mean, sample standard deviation and count.
fn aggregate(df: &DataFrame, x: &str, hue: Option<&str>, y: &str) -> Result<DataFrame, AppError> {
    let mut keys = vec![col(x)];
    keys.extend(hue.filter(|h| *h != x).map(col));

    let present = keys
        .iter()
        .cloned()
        .fold(col(y).is_not_null(), |acc, key| acc.and(key.is_not_null()));

    let grouped = df
        .clone()
        .lazy()
        .filter(present)
        .group_by_stable(keys)
        .agg([
            col(y).cast(DataType::Float64).mean().alias(MEAN_COL),
            col(y).cast(DataType::Float64).std(1).alias(STD_COL),
            col(y).count().cast(DataType::Float64).alias(COUNT_COL),
        ])
        .collect()?;
    Ok(grouped)
}

fn estimates(grouped: &DataFrame) -> Result<Vec<Option<Estimate>>, AppError> {
    let means = grouped.column(MEAN_COL)?.cast(&DataType::Float64)?;
    let stds = grouped.column(STD_COL)?.cast(&DataType::Float64)?;
    let counts = grouped.column(COUNT_COL)?.cast(&DataType::Float64)?;

    let out = means
        .f64()?
        .into_iter()
        .zip(stds.f64()?)
        .zip(counts.f64()?)
        .map(|((mean, std), count)| {
            let mean = mean?;
            let count = count.unwrap_or(0.0) as usize;
            Some(Estimate {
                mean,
                ci: confidence_interval(mean, std, count),
                count,
            })
        })
        .collect();
    Ok(out)
}

/// Normal-approximation 95% interval around `mean`; `None` below two samples.
pub fn confidence_interval(mean: f64, std: Option<f64>, count: usize) -> Option<(f64, f64)> {
    let std = std.filter(|s| s.is_finite())?;
    if count < 2 {
        return None;
    }
    let half = Z_95 * std / (count as f64).sqrt();
    Some((mean - half, mean + half))
}

/// The display label of every key value.
fn key_labels(keys: &Series) -> Result<Vec<String>, AppError> {
    let labels = keys.cast(&DataType::String)?;
    let labels = labels
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();
    Ok(labels)
}

/// Distinct key labels: ascending by value for numeric keys, first
/// appearance otherwise.
fn level_order(keys: &Series, labels: &[String]) -> Result<Vec<String>, AppError> {
    let mut seen: Vec<(f64, &String)> = Vec::new();
    let values: Vec<f64> = if keys.dtype().is_numeric() {
        keys.cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()
    } else {
        vec![0.0; labels.len()]
    };

    for (value, label) in values.into_iter().zip(labels) {
        if !seen.iter().any(|(_, l)| *l == label) {
            seen.push((value, label));
        }
    }
    if keys.dtype().is_numeric() {
        seen.sort_by(|a, b| a.0.total_cmp(&b.0));
    }
    Ok(seen.into_iter().map(|(_, l)| l.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(x: &str, hue: Option<&str>, y: &str) -> PlotRequest {
        PlotRequest::new("t.csv", "t.svg", x, hue.map(str::to_string), y)
    }

    fn scenario() -> DataFrame {
        df! {
            "method" => &["A", "A", "B", "B", "A", "B"],
            "dataset" => &["D1", "D2", "D1", "D2", "D1", "D2"],
            "accuracy" => &[0.8, 0.6, 0.9, 0.7, 0.6, 0.5],
        }
        .unwrap()
    }

    #[test]
    fn groups_by_x_and_hue() {
        let plot =
            prepare_plot_data(&scenario(), &request("dataset", Some("method"), "accuracy"))
                .unwrap();
        assert_eq!(plot.categories, vec!["D1", "D2"]);
        assert_eq!(plot.legend_entries(), vec!["A", "B"]);
        assert_eq!(plot.marks(PlotKind::Bar).len(), 4);
        assert_eq!(plot.x_label, "dataset");
        assert_eq!(plot.y_label, "accuracy");

        let a_d1 = plot.series[0].values[0].unwrap();
        assert!((a_d1.mean - 0.7).abs() < 1e-12);
        assert_eq!(a_d1.count, 2);
        let b_d1 = plot.series[1].values[0].unwrap();
        assert_eq!(b_d1.count, 1);
        assert!(b_d1.ci.is_none());
    }

    #[test]
    fn without_hue_there_is_one_unlabelled_series() {
        let plot = prepare_plot_data(&scenario(), &request("method", None, "accuracy")).unwrap();
        assert!(!plot.has_hue());
        assert!(plot.legend_entries().is_empty());
        assert_eq!(plot.series.len(), 1);
        assert_eq!(plot.categories, vec!["A", "B"]);
        let a = plot.series[0].values[0].unwrap();
        assert!((a.mean - (0.8 + 0.6 + 0.6) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_columns_are_reported() {
        for (x, hue, y) in [
            ("nope", None, "accuracy"),
            ("dataset", None, "nope"),
            ("dataset", Some("nope"), "accuracy"),
        ] {
            let err = prepare_plot_data(&scenario(), &request(x, hue, y)).unwrap_err();
            assert!(matches!(err, AppError::ColumnNotFound(ref c) if c == "nope"));
        }
    }

    #[test]
    fn text_y_column_is_rejected() {
        let err = prepare_plot_data(&scenario(), &request("dataset", None, "method")).unwrap_err();
        assert!(matches!(err, AppError::NonNumericColumn(ref c) if c == "method"));
    }

    #[test]
    fn numeric_categories_ascend() {
        let df = df! {
            "rate" => &[0.3, 0.1, 0.2, 0.1],
            "delay" => &[3.0, 1.0, 2.0, 1.5],
        }
        .unwrap();
        let plot = prepare_plot_data(&df, &request("rate", None, "delay")).unwrap();
        assert_eq!(plot.categories, vec!["0.1", "0.2", "0.3"]);
        assert!((plot.series[0].values[0].unwrap().mean - 1.25).abs() < 1e-12);
    }

    #[test]
    fn text_categories_keep_first_appearance() {
        let df = df! {
            "name" => &["zeta", "alpha", "mid", "alpha"],
            "v" => &[1.0, 2.0, 3.0, 4.0],
        }
        .unwrap();
        let plot = prepare_plot_data(&df, &request("name", None, "v")).unwrap();
        assert_eq!(plot.categories, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn rows_with_missing_values_are_dropped() {
        let df = df! {
            "k" => &[Some("a"), None, Some("b")],
            "v" => &[Some(1.0), Some(5.0), None],
        }
        .unwrap();
        let plot = prepare_plot_data(&df, &request("k", None, "v")).unwrap();
        assert_eq!(plot.categories, vec!["a"]);

        let empty = df! {
            "k" => &[Some("a")],
            "v" => &[None::<f64>],
        }
        .unwrap();
        let err = prepare_plot_data(&empty, &request("k", None, "v")).unwrap_err();
        assert!(matches!(err, AppError::EmptyData));
    }

    #[test]
    fn missing_groups_leave_gaps() {
        let df = df! {
            "x" => &["a", "a", "b"],
            "h" => &["p", "q", "p"],
            "v" => &[1.0, 2.0, 3.0],
        }
        .unwrap();
        let plot = prepare_plot_data(&df, &request("x", Some("h"), "v")).unwrap();
        assert_eq!(plot.series[1].label.as_deref(), Some("q"));
        assert!(plot.series[1].values[1].is_none());
        assert_eq!(plot.marks(PlotKind::Bar).len(), 3);
    }

    #[test]
    fn hue_may_name_the_x_column() {
        let plot = prepare_plot_data(&scenario(), &request("method", Some("method"), "accuracy"))
            .unwrap();
        assert_eq!(plot.categories, vec!["A", "B"]);
        assert_eq!(plot.legend_entries(), vec!["A", "B"]);
        assert!(plot.series[0].values[0].is_some());
        assert!(plot.series[0].values[1].is_none());
        assert!(plot.series[1].values[0].is_none());
        assert_eq!(plot.marks(PlotKind::Bar).len(), 2);
    }

    #[test]
    fn confidence_interval_uses_the_standard_error() {
        let (lo, hi) = confidence_interval(2.0, Some(2f64.sqrt()), 2).unwrap();
        assert!((lo - (2.0 - Z_95)).abs() < 1e-12);
        assert!((hi - (2.0 + Z_95)).abs() < 1e-12);
        assert!(confidence_interval(2.0, Some(1.0), 1).is_none());
        assert!(confidence_interval(2.0, None, 5).is_none());
    }

    #[test]
    fn bars_are_dodged_and_points_centred() {
        let plot =
            prepare_plot_data(&scenario(), &request("dataset", Some("method"), "accuracy"))
                .unwrap();
        let bars = plot.marks(PlotKind::Bar);
        assert!((bars[0].center - -0.2).abs() < 1e-12);
        assert!((bars[0].width - 0.4).abs() < 1e-12);
        let points = plot.marks(PlotKind::Point);
        assert!(points.iter().all(|m| m.center == m.category as f64));
    }

    #[test]
    fn bar_range_includes_zero() {
        let df = df! {
            "x" => &["a", "b"],
            "v" => &[5.0, 10.0],
        }
        .unwrap();
        let plot = prepare_plot_data(&df, &request("x", None, "v")).unwrap();
        let (lo, hi) = plot.value_range(PlotKind::Bar, true);
        assert_eq!(lo, 0.0);
        assert!(hi > 10.0);
        let (lo, _) = plot.value_range(PlotKind::Point, true);
        assert!(lo > 0.0 && lo < 5.0);
    }
}
