//! # tagpress
//!
//! Spreadsheet rows in, printable pallet tags out.
//!
//! Every row of a table becomes a 6×4 inch label: logo, title and a QR code
//! across the top, the row's fields as `LABEL : value` lines down the body,
//! and a footer. The QR code links back to a scan viewer carrying the row's
//! data, so a tag can be read without the spreadsheet at hand.
//!
//! Layout is page-native. A row whose fields don't fit continues on
//! further labels, each with the full header repeated; a field is never
//! split across two labels.
//!
//! ## Architecture
//!
//! ```text
//! Input (.xlsx / JSON cell matrix)
//!       ↓
//!   [ingest]     — Read the first sheet into raw cells
//!       ↓
//!   [normalize]  — Drop blank rows, split header from rows
//!       ↓
//!   [assemble]   — One layout pass per row, pages kept in row order
//!       ↓
//!   [layout]     — Fixed regions, wrapped body, grid, overflow
//!       ↓           (uses [font], [text], [code], [payload])
//!   [pdf]        — Serialize to PDF bytes
//! ```
//!
//! [`viewer`] is the other end: it turns a scanned code back into the
//! fields it was built from.

pub mod assemble;
pub mod code;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod payload;
pub mod pdf;
pub mod text;
pub mod viewer;

pub use assemble::{output_name, DocumentAssembler, LabelAssets, LabelDocument};
pub use error::{Result, TagError};
pub use model::{Cell, LayoutConfig, Table};

use code::QrCodeGenerator;
use font::FontContext;
use layout::LayoutPage;

/// Lay out every row of `table` with the default QR generator.
pub fn layout_table(table: &Table, config: &LayoutConfig, assets: &LabelAssets) -> Vec<LayoutPage> {
    let font_context = FontContext::new();
    let codes = QrCodeGenerator::new();
    DocumentAssembler::new(config, &font_context, &codes).assemble(table, assets)
}

/// Render a table to PDF bytes.
///
/// This is the primary entry point. Fails on an invalid config or when the
/// table produces no pages at all.
pub fn render(table: &Table, config: &LayoutConfig, assets: &LabelAssets) -> Result<Vec<u8>> {
    config.validate()?;
    let font_context = FontContext::new();
    let codes = QrCodeGenerator::new();
    let document = LabelDocument {
        name: assemble::DEFAULT_OUTPUT_NAME.to_string(),
        pages: DocumentAssembler::new(config, &font_context, &codes).assemble(table, assets),
    };
    document.to_pdf(&font_context)
}

/// Render a JSON cell matrix (`[["SKU","QTY"],["ABC123",50]]`) with the
/// default label configuration.
pub fn render_json(json: &str) -> Result<Vec<u8>> {
    let table = normalize::normalize(ingest::from_json(json)?);
    render(&table, &LayoutConfig::default(), &LabelAssets::default())
}
