//! # Ingestion
//!
//! Reads a source file into the raw cell matrix [`normalize`] expects.
//!
//! A JSON array of arrays is always accepted. Spreadsheets (`.xlsx`,
//! `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read with `calamine` through the
//! default `xlsx` feature; only the first sheet is used.
//!
//! [`normalize`]: crate::normalize::normalize

use std::path::Path;

use crate::error::{Result, TagError};
use crate::model::{Row, Table};
use crate::normalize::normalize;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Parse a JSON cell matrix: `[["SKU","QTY"],["ABC123",50]]`.
pub fn from_json(json: &str) -> Result<Vec<Row>> {
    Ok(serde_json::from_str(json)?)
}

/// Read a source file into raw rows, picking the reader by extension.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        return read_spreadsheet(path);
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| TagError::Ingest(format!("{}: {}", path.display(), e)))?;
    from_json(&text)
}

/// Read and normalize in one step.
pub fn load_table(path: &Path) -> Result<Table> {
    let raw = read_rows(path)?;
    let table = normalize(raw);
    log::info!(
        "{}: {} column(s), {} row(s)",
        path.display(),
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

#[cfg(feature = "xlsx")]
fn read_spreadsheet(path: &Path) -> Result<Vec<Row>> {
    use calamine::{open_workbook_auto, Data, Reader};

    use crate::model::Cell;

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| TagError::Ingest(format!("{}: {}", path.display(), e)))?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| TagError::Ingest(format!("{} [{}]: {}", path.display(), sheet, e)))?;

    let rows = range
        .rows()
        .map(|cells| {
            cells
                .iter()
                .map(|data| match data {
                    Data::Empty => Cell::Empty,
                    Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                        Cell::Text(s.clone())
                    }
                    Data::Int(i) => Cell::Number(*i as f64),
                    Data::Float(f) => Cell::Number(*f),
                    Data::Bool(b) => Cell::Bool(*b),
                    Data::DateTime(dt) => Cell::Number(dt.as_f64()),
                    Data::Error(e) => Cell::Text(e.to_string()),
                })
                .collect()
        })
        .collect();
    Ok(rows)
}

#[cfg(not(feature = "xlsx"))]
fn read_spreadsheet(path: &Path) -> Result<Vec<Row>> {
    Err(TagError::Ingest(format!(
        "{}: spreadsheet support not compiled in (enable the `xlsx` feature)",
        path.display()
    )))
}
