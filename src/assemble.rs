//! # Document Assembly
//!
//! Runs the layout engine over every row of a table, concatenates the
//! resulting pages in row order and writes the finished document.

use std::path::{Path, PathBuf};

use crate::code::CodeGenerator;
use crate::error::Result;
use crate::font::FontContext;
use crate::image_loader::{load_image, LoadedImage};
use crate::layout::{LayoutEngine, LayoutPage};
use crate::model::{LayoutConfig, Table};
use crate::pdf::{DocumentInfo, PdfWriter};

/// Name used when the source file name is missing or empty.
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Images shared by every page of a run.
#[derive(Debug, Clone, Default)]
pub struct LabelAssets {
    pub logo: Option<LoadedImage>,
}

impl LabelAssets {
    /// Load the logo once for the whole document. A logo that can't be read
    /// is logged and left out; it never stops generation.
    pub fn load(logo_src: Option<&str>) -> Self {
        let logo = logo_src.and_then(|src| match load_image(src) {
            Ok(img) => Some(img),
            Err(e) => {
                log::warn!("logo omitted: {}", e);
                None
            }
        });
        Self { logo }
    }
}

/// The output of a generation run.
#[derive(Debug, Clone)]
pub struct LabelDocument {
    /// File stem, without `.pdf`.
    pub name: String,
    pub pages: Vec<LayoutPage>,
}

impl LabelDocument {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.name)
    }

    /// Serialize to PDF bytes with the document name as its title.
    pub fn to_pdf(&self, font_context: &FontContext) -> Result<Vec<u8>> {
        let info = DocumentInfo {
            title: Some(self.name.clone()),
        };
        PdfWriter::new().write(&self.pages, &info, font_context)
    }

    /// Write `<name>.pdf` into `dir`. A document with no pages is not saved
    /// and yields `None`.
    pub fn save(&self, dir: &Path, font_context: &FontContext) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            log::warn!("nothing to generate, {} not written", self.file_name());
            return Ok(None);
        }
        let path = dir.join(self.file_name());
        self.save_as(&path, font_context)?;
        Ok(Some(path))
    }

    /// Write the PDF to an explicit path.
    pub fn save_as(&self, path: &Path, font_context: &FontContext) -> Result<()> {
        let bytes = self.to_pdf(font_context)?;
        std::fs::write(path, &bytes)?;
        log::info!(
            "saved {} ({} page(s), {} bytes)",
            path.display(),
            self.pages.len(),
            bytes.len()
        );
        Ok(())
    }
}

/// Strip the final extension from a source file name.
///
/// `stock.xlsx` becomes `stock`, `a.b.csv` becomes `a.b`. Directories are
/// dropped. Missing or empty names fall back to [`DEFAULT_OUTPUT_NAME`].
pub fn output_name(source: Option<&str>) -> String {
    source
        .map(Path::new)
        .and_then(|p| p.file_name())
        .map(|name| {
            let name = Path::new(name);
            name.file_stem().unwrap_or(name.as_os_str())
        })
        .and_then(|stem| stem.to_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string())
}

/// Lays out a whole table into one document.
pub struct DocumentAssembler<'a> {
    config: &'a LayoutConfig,
    font_context: &'a FontContext,
    codes: &'a dyn CodeGenerator,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(
        config: &'a LayoutConfig,
        font_context: &'a FontContext,
        codes: &'a dyn CodeGenerator,
    ) -> Self {
        Self {
            config,
            font_context,
            codes,
        }
    }

    /// Pages for every row, rows in order, each row's continuation pages in order.
    pub fn assemble(&self, table: &Table, assets: &LabelAssets) -> Vec<LayoutPage> {
        let engine = LayoutEngine::new(self.config, self.font_context, self.codes);
        let mut pages = Vec::new();
        for (i, row) in table.rows.iter().enumerate() {
            let row_number = u32::try_from(i + 1).unwrap_or(u32::MAX);
            pages.extend(engine.layout_row(row_number, &table.headers, row, assets.logo.as_ref()));
        }
        log::debug!("{} row(s) -> {} page(s)", table.rows.len(), pages.len());
        pages
    }

    /// Assemble and name the document.
    pub fn build(&self, table: &Table, assets: &LabelAssets, source_name: Option<&str>) -> LabelDocument {
        LabelDocument {
            name: output_name(source_name),
            pages: self.assemble(table, assets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::QrCodeGenerator;
    use crate::model::Cell;

    fn table() -> Table {
        Table {
            headers: vec!["SKU".to_string(), "QTY".to_string()],
            rows: vec![
                vec![Cell::from("A"), Cell::from(1i64)],
                vec![Cell::from("B"), Cell::from(2i64)],
                vec![Cell::from("C"), Cell::from(3i64)],
            ],
        }
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(Some("stock.xlsx")), "stock");
        assert_eq!(output_name(Some("a.b.csv")), "a.b");
        assert_eq!(output_name(Some("/tmp/in/march.json")), "march");
        assert_eq!(output_name(Some("noext")), "noext");
        assert_eq!(output_name(Some("")), "output");
        assert_eq!(output_name(None), "output");
    }

    #[test]
    fn test_rows_in_order() {
        let config = LayoutConfig::default();
        let fonts = FontContext::new();
        let codes = QrCodeGenerator::new();
        let pages = DocumentAssembler::new(&config, &fonts, &codes)
            .assemble(&table(), &LabelAssets::default());
        let rows: Vec<u32> = pages.iter().map(|p| p.row_number).collect();
        assert_eq!(rows, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_logo_is_not_fatal() {
        let assets = LabelAssets::load(Some("/definitely/not/here.png"));
        assert!(assets.logo.is_none());
        assert!(LabelAssets::load(None).logo.is_none());
    }

    #[test]
    fn test_empty_document_is_not_saved() {
        let config = LayoutConfig::default();
        let fonts = FontContext::new();
        let codes = QrCodeGenerator::new();
        let doc = DocumentAssembler::new(&config, &fonts, &codes).build(
            &Table::default(),
            &LabelAssets::default(),
            Some("empty.xlsx"),
        );
        assert!(doc.is_empty());
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(doc.save(dir.path(), &fonts).unwrap(), None);
        assert!(!dir.path().join("empty.pdf").exists());
    }

    #[test]
    fn test_save_writes_named_pdf() {
        let config = LayoutConfig::default();
        let fonts = FontContext::new();
        let codes = QrCodeGenerator::new();
        let doc = DocumentAssembler::new(&config, &fonts, &codes).build(
            &table(),
            &LabelAssets::default(),
            Some("stock.xlsx"),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = doc.save(dir.path(), &fonts).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "stock.pdf");
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(String::from_utf8_lossy(&bytes).contains("/Title (stock)"));
    }
}
