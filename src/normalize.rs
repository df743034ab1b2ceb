//! # Row Normalization
//!
//! Turns the raw cell matrix handed over by ingestion into a [`Table`]:
//! blank rows are dropped, the first surviving row becomes the header and
//! the rest become data rows. Pure, never fails.

use crate::model::{Cell, Row, Table};

/// Normalize a raw cell matrix into a header plus data rows.
///
/// A row is blank when every cell is empty or whitespace-only text. If no
/// non-blank rows remain the result is an empty table, which callers treat
/// as "nothing to generate".
pub fn normalize(raw: Vec<Row>) -> Table {
    let mut surviving = raw
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.is_blank()));

    let headers = match surviving.next() {
        Some(first) => first.iter().map(Cell::display).collect(),
        None => return Table::default(),
    };

    Table {
        headers,
        rows: surviving.collect(),
    }
}
