use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported output format for: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data processing error (Polars): {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Spreadsheet error (Calamine): {0}")]
    Excel(#[from] calamine::Error),

    #[error("Column '{0}' not found in the data")]
    ColumnNotFound(String),

    #[error("Column '{0}' is not numeric")]
    NonNumericColumn(String),

    #[error("No rows left to plot after dropping missing values")]
    EmptyData,

    #[error("Rendering error: {0}")]
    Render(String),
}
