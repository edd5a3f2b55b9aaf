//! The main library for the `catplot` application.
//!
//! This crate reads a tabular file, aggregates one numeric column per
//! category (and optional hue group), and renders the result as a bar or
//! point chart written to two files: the requested output, in the format its
//! extension names, and a JPEG copy at the same path with `.jpg` appended.
//!
//! The library is structured into several modules:
//! - `cli`: Defines the command-line interface.
//! - `config`: The plot request, plot kind and style.
//! - `data_loader`: Handles reading tabular files into DataFrames.
//! - `processing`: Column validation and grouped statistics.
//! - `palette`: The fixed series colours.
//! - `plotter`: Draws a chart onto any plotters backend.
//! - `output`: Output formats and file naming.
//! - `error`: Defines the application's custom error type.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub mod cli;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod output;
pub mod palette;
pub mod plotter;
pub mod processing;

use crate::cli::Cli;
pub use crate::config::{PlotKind, PlotRequest, PlotStyle};
pub use crate::error::AppError;
use crate::output::OutputFormat;
use crate::plotter::Layout;

/// Entry point for the command line: builds the request and generates the plot.
///
/// # Errors
///
/// Returns an error if any step of `generate_plot` fails.
pub fn run(cli: &Cli) -> Result<()> {
    let request = cli.to_request();
    generate_plot(&request).with_context(|| {
        format!(
            "Failed to plot '{}' into '{}'",
            request.source_path().display(),
            request.output_path().display()
        )
    })
}

/// Loads the table, aggregates it and writes both output files.
///
/// Every rendering surface is created and dropped inside this call, so
/// repeated invocations are independent of each other.
///
/// # Errors
///
/// * `AppError::UnsupportedFormat` if the output extension has no backend.
///   Checked before anything is read or written.
/// * `AppError::Io` / `AppError::Polars` if the table cannot be read.
/// * `AppError::ColumnNotFound` if x, y or hue is not a column.
/// * `AppError::Render` if a backend fails.
pub fn generate_plot(request: &PlotRequest) -> Result<(), AppError> {
    let source = request.source_path();
    let output = request.output_path();
    let format = OutputFormat::from_path(&output)?;

    info!("Processing '{}'...", source.display());
    let df = data_loader::load_dataframe(&source)?;

    debug!("  -> Detected columns:");
    for s in df.get_columns() {
        debug!("     - {}: {:?}", s.name(), s.dtype());
    }
    debug!("  -> Shape: {} rows x {} cols", df.height(), df.width());

    let plot = processing::prepare_plot_data(&df, request)?;
    let layout = Layout::for_plot(&plot, request);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let jpg = output::jpg_sibling(&output);
    for (path, format) in [(output.as_path(), format), (jpg.as_path(), OutputFormat::Raster)] {
        output::render_to(path, format, &plot, request, &layout)?;
        info!("  -> Plot saved to '{}'", path.display());
    }

    Ok(())
}

/// Convenience wrapper over `generate_plot` with the default rotation and kind.
pub fn plot_csv(
    source: &Path,
    output: &Path,
    x: &str,
    hue: Option<&str>,
    y: &str,
) -> Result<(), AppError> {
    generate_plot(&PlotRequest::new(
        source,
        output,
        x,
        hue.map(str::to_string),
        y,
    ))
}
