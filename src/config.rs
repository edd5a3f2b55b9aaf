//! Plot configuration.
//!
//! A `PlotRequest` describes one invocation of the generator: where to read
//! the table, where to write the chart, which columns to use and how the
//! chart should look. It is built once (from the command line or by a caller),
//! consumed by `generate_plot`, and dropped.

use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Default rotation of the x tick labels, in degrees (vertical text).
pub const DEFAULT_ROTATION: f64 = 90.0;

/// The rendering primitive used for each (x, hue) group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PlotKind {
    /// One bar per (x, hue) pair, dodged side by side within the category.
    #[default]
    Bar,
    /// One marker per (x, hue) pair, markers of the same series joined by a line.
    #[value(alias = "line")]
    Point,
}

/// Visual settings that apply to a single rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    /// Width of the plot area in pixels, excluding the legend column.
    pub width: u32,
    /// Height of the canvas in pixels.
    pub height: u32,
    /// Multiplier for every font size.
    pub font_scale: f64,
    /// Draw 95% confidence-interval bars around each mean.
    pub error_bars: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            font_scale: 1.0,
            error_bars: true,
        }
    }
}

/// Everything needed to produce one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    /// The tabular file to read.
    pub source: PathBuf,
    /// The primary output file; its extension selects the format.
    pub output: PathBuf,
    /// Column whose distinct values become the x categories.
    pub x: String,
    /// Optional column whose distinct values become separate series.
    pub hue: Option<String>,
    /// Column aggregated (mean) for each group.
    pub y: String,
    /// Rotation of the x tick labels, in degrees.
    pub rotation: f64,
    pub kind: PlotKind,
    /// Directory that relative `source` and `output` paths are resolved against.
    pub base_dir: Option<PathBuf>,
    pub style: PlotStyle,
}

impl PlotRequest {
    /// Creates a request with the default rotation, bar kind and style.
    pub fn new(
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        x: impl Into<String>,
        hue: Option<String>,
        y: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            x: x.into(),
            hue,
            y: y.into(),
            rotation: DEFAULT_ROTATION,
            kind: PlotKind::default(),
            base_dir: None,
            style: PlotStyle::default(),
        }
    }

    pub fn with_kind(mut self, kind: PlotKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_style(mut self, style: PlotStyle) -> Self {
        self.style = style;
        self
    }

    /// The source path, joined onto the base directory when it is relative.
    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.source)
    }

    /// The primary output path, joined onto the base directory when it is relative.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Snaps an angle in degrees to a whole number of counter-clockwise quarter
/// turns in `0..4`.
pub fn quarter_turns(degrees: f64) -> u8 {
    ((degrees / 90.0).round() as i64).rem_euclid(4) as u8
}

/// True when `degrees` is not already a multiple of 90.
pub fn needs_snapping(degrees: f64) -> bool {
    let snapped = (degrees / 90.0).round() * 90.0;
    (degrees - snapped).abs() > 1e-9
}
