use crate::config::{PlotKind, PlotRequest, PlotStyle, DEFAULT_ROTATION};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A tool to render grouped bar and point charts from tabular data files."
)]
pub struct Cli {
    /// The tabular file (CSV with a header row) to read.
    #[arg(long = "csv_file_name", default_value = "")]
    pub csv_file_name: String,

    /// The chart to write. Its extension selects the format;
    /// a JPEG copy is written alongside with ".jpg" appended.
    #[arg(long = "plot_file_name", default_value = "")]
    pub plot_file_name: String,

    /// Column providing the x-axis categories.
    #[arg(long, default_value = "")]
    pub x: String,

    /// Column splitting each category into coloured series.
    /// An empty value means no grouping.
    #[arg(long)]
    pub hue: Option<String>,

    /// Column averaged for each category (and series).
    #[arg(long, default_value = "")]
    pub y: String,

    /// Rotation of the x tick labels, in degrees.
    #[arg(long, default_value_t = DEFAULT_ROTATION, allow_hyphen_values = true)]
    pub rotation: f64,

    /// Rendering primitive.
    #[arg(long, value_enum, default_value_t = PlotKind::Bar)]
    pub kind: PlotKind,

    /// Directory that relative input and output paths are resolved against.
    #[arg(long = "base_dir")]
    pub base_dir: Option<PathBuf>,

    /// Width of the plot area in pixels (the legend adds to it).
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Height of the chart in pixels.
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// Multiplier applied to every font size.
    #[arg(long = "font_scale", default_value_t = 1.0)]
    pub font_scale: f64,

    /// Omit the confidence-interval bars.
    #[arg(long = "no_errorbars", default_value_t = false)]
    pub no_errorbars: bool,

    /// Print debug info about detected columns and groups
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl Cli {
    /// Builds the plot request these arguments describe, without validating them.
    pub fn to_request(&self) -> PlotRequest {
        let hue = self.hue.clone().filter(|h| !h.is_empty());
        let style = PlotStyle {
            width: self.width,
            height: self.height,
            font_scale: self.font_scale,
            error_bars: !self.no_errorbars,
        };
        let mut request = PlotRequest::new(
            &self.csv_file_name,
            &self.plot_file_name,
            &self.x,
            hue,
            &self.y,
        )
        .with_kind(self.kind)
        .with_rotation(self.rotation)
        .with_style(style);
        if let Some(base_dir) = &self.base_dir {
            request = request.with_base_dir(base_dir);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_five_string_flags() {
        let cli = Cli::try_parse_from([
            "catplot",
            "--csv_file_name",
            "results/t.csv",
            "--plot_file_name",
            "results/t.pdf",
            "--x",
            "Data_Packet_Injection_Rate",
            "--hue",
            "Routing+Selection",
            "--y",
            "Payload_Throughput",
        ])
        .unwrap();
        let request = cli.to_request();
        assert_eq!(request.source, PathBuf::from("results/t.csv"));
        assert_eq!(request.output, PathBuf::from("results/t.pdf"));
        assert_eq!(request.x, "Data_Packet_Injection_Rate");
        assert_eq!(request.hue.as_deref(), Some("Routing+Selection"));
        assert_eq!(request.y, "Payload_Throughput");
        assert_eq!(request.rotation, 90.0);
        assert_eq!(request.kind, PlotKind::Bar);
    }

    #[test]
    fn every_flag_is_optional() {
        let cli = Cli::try_parse_from(["catplot"]).unwrap();
        let request = cli.to_request();
        assert_eq!(request.source, PathBuf::from(""));
        assert_eq!(request.x, "");
        assert!(request.hue.is_none());
        assert!(request.style.error_bars);
    }

    #[test]
    fn empty_hue_means_no_grouping() {
        let cli = Cli::try_parse_from(["catplot", "--hue", ""]).unwrap();
        assert!(cli.to_request().hue.is_none());
    }

    #[test]
    fn extended_flags_reach_the_request() {
        let cli = Cli::try_parse_from([
            "catplot",
            "--kind",
            "line",
            "--rotation",
            "-90",
            "--base_dir",
            "../..",
            "--font_scale",
            "1.5",
            "--no_errorbars",
        ])
        .unwrap();
        let request = cli.to_request();
        assert_eq!(request.kind, PlotKind::Point);
        assert_eq!(request.rotation, -90.0);
        assert_eq!(request.base_dir, Some(PathBuf::from("../..")));
        assert_eq!(request.style.font_scale, 1.5);
        assert!(!request.style.error_bars);
    }
}
