use crate::error::AppError;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Loads a tabular file into a Polars DataFrame.
///
/// The format follows the extension: Parquet, JSON lines and Excel are read
/// with their own readers, anything else is read as delimited text with a
/// header row.
pub fn load_dataframe(path: &Path) -> Result<DataFrame, AppError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let mut df = match extension.as_str() {
        "parquet" => ParquetReader::new(File::open(path)?).finish()?,
        "json" | "jsonl" | "ndjson" => JsonReader::new(File::open(path)?)
            .with_json_format(JsonFormat::JsonLines)
            .finish()?,
        "xlsx" | "xls" => load_excel_dataframe(path)?,
        _ => CsvReader::new(File::open(path)?).finish()?,
    };

    try_cast_string_columns_to_numeric(&mut df)?;
    Ok(df)
}

/// Cast string columns into Float64 when every non-null value parses as a
/// number. A column with any text value is left untouched.
fn try_cast_string_columns_to_numeric(df: &mut DataFrame) -> Result<(), AppError> {
    let col_names: Vec<String> = df
        .get_columns()
        .iter()
        .map(|s| s.name().to_string())
        .collect();

    for name in col_names {
        let s = df.column(&name)?.clone();
        if matches!(s.dtype(), DataType::String) {
            let parsed_vals: Option<Vec<Option<f64>>> = s
                .str()?
                .into_iter()
                .map(|v| match v {
                    None => Some(None),
                    Some(t) => t.trim().parse::<f64>().ok().map(Some),
                })
                .collect();
            if let Some(parsed_vals) = parsed_vals {
                df.replace(&name, Series::new(&name, parsed_vals))?;
            }
        }
    }
    Ok(())
}

/// Loads an Excel file (first worksheet) into a DataFrame of string columns.
fn load_excel_dataframe(path: &Path) -> Result<DataFrame, AppError> {
    use calamine::{open_workbook_auto, DataType as Xl, Reader};

    let unsupported = || AppError::UnsupportedFormat(path.to_string_lossy().to_string());

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(unsupported)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(unsupported)??;

    let rows: Vec<Vec<Xl>> = range.rows().map(|r| r.to_vec()).collect();
    let header_idx = rows
        .iter()
        .position(|r| !r.iter().all(|c| matches!(c, Xl::Empty)))
        .ok_or_else(unsupported)?;

    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if col_count == 0 {
        return Err(unsupported());
    }

    let headers: Vec<String> = (0..col_count)
        .map(|i| {
            let name = rows[header_idx]
                .get(i)
                .and_then(cell_to_string)
                .unwrap_or_default();
            if name.is_empty() {
                format!("col_{}", i + 1)
            } else {
                name
            }
        })
        .collect();

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); col_count];
    for row in rows.iter().skip(header_idx + 1) {
        for (ci, column) in columns.iter_mut().enumerate() {
            column.push(row.get(ci).and_then(cell_to_string));
        }
    }

    let series_vec: Vec<Series> = headers
        .iter()
        .zip(&columns)
        .map(|(name, values)| Series::new(name.as_str(), values))
        .collect();
    Ok(DataFrame::new(series_vec)?)
}

fn cell_to_string(cell: &calamine::DataType) -> Option<String> {
    use calamine::DataType as Xl;

    match cell {
        Xl::Empty | Xl::Error(_) => None,
        Xl::String(s) | Xl::DateTimeIso(s) | Xl::DurationIso(s) => Some(s.trim().to_string()),
        Xl::Float(v) | Xl::DateTime(v) | Xl::Duration(v) => Some(v.to_string()),
        Xl::Int(v) => Some(v.to_string()),
        Xl::Bool(v) => Some(v.to_string()),
    }
}
