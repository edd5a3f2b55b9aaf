use crate::config::{needs_snapping, quarter_turns, PlotKind, PlotRequest};
use crate::error::AppError;
use crate::palette;
use crate::processing::{CategoricalPlot, Mark};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::warn;

const FONT_FAMILY: &str = "sans-serif";
const TICK_FONT_PX: f64 = 16.0;
const DESC_FONT_PX: f64 = 20.0;
/// Rough advance of one glyph relative to the font size.
const GLYPH_WIDTH: f64 = 0.6;
const MARGIN: u32 = 15;
const SWATCH: u32 = 14;
const MARKER_RADIUS: u32 = 5;
/// Upper bound on the number of y tick labels.
const Y_LABELS: usize = 10;

/// Canvas geometry of one chart.
///
/// The plot column always has the requested width; a hue legend adds its
/// own column on the right, so the saved canvas grows instead of the legend
/// being clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub plot_width: u32,
    pub legend_width: u32,
    pub height: u32,
    pub x_label_area: u32,
    pub y_label_area: u32,
    /// Decimals shown on the y tick labels.
    pub y_decimals: usize,
}

impl Layout {
    pub fn for_plot(plot: &CategoricalPlot, request: &PlotRequest) -> Self {
        let style = &request.style;
        let tick_px = TICK_FONT_PX * style.font_scale;
        let desc_px = DESC_FONT_PX * style.font_scale;

        let longest_category = plot
            .categories
            .iter()
            .map(|c| c.chars().count())
            .max()
            .unwrap_or(0);
        let tick_extent = if quarter_turns(request.rotation) % 2 == 1 {
            text_width(longest_category, tick_px)
        } else {
            tick_px
        };
        let x_label_area = (tick_extent + desc_px * 2.0 + 10.0).ceil() as u32;

        let (y_min, y_max) = plot.value_range(request.kind, style.error_bars);
        let y_decimals = tick_decimals(y_min, y_max);
        let longest_tick = [y_min, y_max]
            .iter()
            .map(|v| format_tick(*v, y_decimals).len())
            .max()
            .unwrap_or(0);
        let y_label_area = (text_width(longest_tick + 1, tick_px) + desc_px * 2.0).ceil() as u32;

        let legend_width = if plot.has_hue() {
            let longest = plot
                .legend_entries()
                .iter()
                .map(|l| l.chars().count())
                .max()
                .unwrap_or(0);
            (text_width(longest, tick_px) + (SWATCH + 3 * MARGIN) as f64).ceil() as u32
        } else {
            0
        };

        Self {
            plot_width: style.width,
            legend_width,
            height: style.height,
            x_label_area,
            y_label_area,
            y_decimals,
        }
    }

    /// The full canvas, plot column plus legend column.
    pub fn canvas(&self) -> (u32, u32) {
        (self.plot_width + self.legend_width, self.height)
    }
}

fn text_width(chars: usize, font_px: f64) -> f64 {
    chars as f64 * font_px * GLYPH_WIDTH
}

/// Decimals needed to tell apart ticks spaced over `lo..hi`.
fn tick_decimals(lo: f64, hi: f64) -> usize {
    let step = (hi - lo) / Y_LABELS as f64;
    if !step.is_finite() || step <= 0.0 {
        return 0;
    }
    (-step.log10().floor()).max(0.0) as usize
}

fn format_tick(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

fn render_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Render(e.to_string())
}

/// The text transform for the x tick labels. Text can only be turned in
/// quarter turns; 90 degrees reads bottom to top.
fn tick_transform(rotation: f64) -> FontTransform {
    if needs_snapping(rotation) {
        warn!(
            "  -> Rotation {} is not a multiple of 90 degrees, using {}",
            rotation,
            quarter_turns(rotation) as u32 * 90
        );
    }
    match quarter_turns(rotation) {
        1 => FontTransform::Rotate270,
        2 => FontTransform::Rotate180,
        3 => FontTransform::Rotate90,
        _ => FontTransform::None,
    }
}

/// Label of the category centred on `value`, if any.
fn category_at(categories: &[String], value: f64) -> Option<&str> {
    let index = value.round();
    if (value - index).abs() > 1e-6 || index < 0.0 {
        return None;
    }
    categories.get(index as usize).map(String::as_str)
}

fn mark_color(plot: &CategoricalPlot, kind: PlotKind, mark: &Mark) -> RGBColor {
    if plot.has_hue() || kind == PlotKind::Point {
        palette::color(mark.series)
    } else {
        palette::color(mark.category)
    }
}

/// Draws the chart onto `root`, whose size must match `layout.canvas()`,
/// and presents it.
pub fn draw_plot<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plot: &CategoricalPlot,
    request: &PlotRequest,
    layout: &Layout,
) -> Result<(), AppError> {
    let style = &request.style;
    let tick_font = (FONT_FAMILY, TICK_FONT_PX * style.font_scale).into_font();
    let desc_font = (FONT_FAMILY, DESC_FONT_PX * style.font_scale).into_font();

    root.fill(&WHITE).map_err(render_error)?;
    let (plot_area, legend_area) = root.split_horizontally(layout.plot_width);

    let n = plot.categories.len() as f64;
    let (y_min, y_max) = plot.value_range(request.kind, style.error_bars);

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(MARGIN)
        .x_label_area_size(layout.x_label_area)
        .y_label_area_size(layout.y_label_area)
        .build_cartesian_2d(-0.5f64..n - 0.5, y_min..y_max)
        .map_err(render_error)?;

    let categories = &plot.categories;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len())
        .x_label_formatter(&|v| category_at(categories, *v).unwrap_or_default().to_string())
        .x_label_style(tick_font.clone().transform(tick_transform(request.rotation)))
        .y_labels(Y_LABELS)
        .y_label_formatter(&|v| format_tick(*v, layout.y_decimals))
        .y_label_style(tick_font.clone())
        .x_desc(plot.x_label.as_str())
        .y_desc(plot.y_label.as_str())
        .axis_desc_style(desc_font)
        .draw()
        .map_err(render_error)?;

    let marks = plot.marks(request.kind);
    match request.kind {
        PlotKind::Bar => {
            chart
                .draw_series(marks.iter().map(|m| {
                    let left = m.center - m.width / 2.0;
                    Rectangle::new(
                        [(left, 0.0), (left + m.width, m.estimate.mean)],
                        mark_color(plot, request.kind, m).filled(),
                    )
                }))
                .map_err(render_error)?;
        }
        PlotKind::Point => {
            for (si, _) in plot.series.iter().enumerate() {
                let color = palette::color(si);
                let points: Vec<(f64, f64)> = marks
                    .iter()
                    .filter(|m| m.series == si)
                    .map(|m| (m.center, m.estimate.mean))
                    .collect();
                chart
                    .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
                    .map_err(render_error)?;
                chart
                    .draw_series(
                        points
                            .into_iter()
                            .map(|p| Circle::new(p, MARKER_RADIUS, color.filled())),
                    )
                    .map_err(render_error)?;
            }
        }
    }

    if style.error_bars {
        chart
            .draw_series(marks.iter().filter_map(|m| {
                let (low, high) = m.estimate.ci?;
                Some(ErrorBar::new_vertical(
                    m.center,
                    low,
                    m.estimate.mean,
                    high,
                    BLACK.stroke_width(2),
                    (MARKER_RADIUS * 2).max((layout.plot_width as f64 * m.width / n / 4.0) as u32),
                ))
            }))
            .map_err(render_error)?;
    }

    if plot.has_hue() {
        draw_legend(&legend_area, plot, request.kind, &tick_font)?;
    }

    root.present().map_err(render_error)?;
    Ok(())
}

/// One swatch and label per hue level, top-aligned, no title.
fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    plot: &CategoricalPlot,
    kind: PlotKind,
    font: &FontDesc,
) -> Result<(), AppError> {
    let row_height = (font.get_size().ceil() as i32).max(SWATCH as i32) + 8;
    let x = MARGIN as i32;
    for (i, label) in plot.legend_entries().into_iter().enumerate() {
        let y = MARGIN as i32 + i as i32 * row_height;
        let color = palette::color(i);
        match kind {
            PlotKind::Bar => area
                .draw(&Rectangle::new(
                    [(x, y), (x + SWATCH as i32, y + SWATCH as i32)],
                    color.filled(),
                ))
                .map_err(render_error)?,
            PlotKind::Point => area
                .draw(&Circle::new(
                    (x + SWATCH as i32 / 2, y + SWATCH as i32 / 2),
                    MARKER_RADIUS,
                    color.filled(),
                ))
                .map_err(render_error)?,
        }
        area.draw(&Text::new(
            label.to_string(),
            (x + SWATCH as i32 + MARGIN as i32 / 2, y),
            font.clone(),
        ))
        .map_err(render_error)?;
    }
    Ok(())
}
