//! Output files: format selection from the extension and the JPEG sibling.

use crate::config::PlotRequest;
use crate::error::AppError;
use crate::plotter::{self, Layout};
use crate::processing::CategoricalPlot;
use plotters::prelude::*;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use svg2pdf::usvg;

/// The kind of drawing backend an output path needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Vector document.
    Svg,
    /// PDF document, converted from the vector rendering.
    Pdf,
    /// Bitmap image, encoded according to the extension.
    Raster,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match extension.as_str() {
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            "png" | "jpg" | "jpeg" | "bmp" => Ok(Self::Raster),
            _ => Err(AppError::UnsupportedFormat(
                path.to_string_lossy().to_string(),
            )),
        }
    }
}

/// The raster copy: the full output path with ".jpg" appended, so that
/// `chart.svg` becomes `chart.svg.jpg`.
pub fn jpg_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".jpg");
    PathBuf::from(name)
}

/// Renders `plot` into a fresh backend at `path`. The backend is flushed
/// and dropped before this returns.
pub fn render_to(
    path: &Path,
    format: OutputFormat,
    plot: &CategoricalPlot,
    request: &PlotRequest,
    layout: &Layout,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Svg => {
            let root = SVGBackend::new(path, layout.canvas()).into_drawing_area();
            plotter::draw_plot(&root, plot, request, layout)
        }
        OutputFormat::Pdf => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, layout.canvas()).into_drawing_area();
                plotter::draw_plot(&root, plot, request, layout)?;
            }
            fs::write(path, svg_to_pdf(&svg)?)?;
            Ok(())
        }
        OutputFormat::Raster => {
            let root = BitMapBackend::new(path, layout.canvas()).into_drawing_area();
            plotter::draw_plot(&root, plot, request, layout)
        }
    }
}

/// Converts an SVG document into a single-page PDF. Text is laid out with
/// the system fonts.
fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, AppError> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options)
        .map_err(|e| AppError::Render(e.to_string()))?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| AppError::Render(e.to_string()))
}
