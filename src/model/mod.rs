//! # Data Model
//!
//! The input side of the engine: a table of cells (header + rows), the
//! per-row [`Field`] list derived from it, and the [`LayoutConfig`] that
//! fixes label geometry for a whole generation run.
//!
//! Everything here deserializes from camelCase JSON and every config field
//! has a default, so `{}` is a valid config describing the stock
//! 6×4 inch pallet tag.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagError};

/// One spreadsheet cell as produced by ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Missing, null, or a cell that never existed.
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// True for empty cells and text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Bool(_) | Cell::Number(_) => false,
        }
    }

    /// The string form used when drawing the cell.
    ///
    /// Integral numbers print without a fractional part (`50`, not `50.0`).
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A raw row of cells, positionally aligned with the header.
pub type Row = Vec<Cell>;

/// Column labels in field order. Entries may be empty.
pub type Header = Vec<String>;

/// A normalized table: header strings plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Header,
    pub rows: Vec<Row>,
}

impl Table {
    /// A table with no rows has nothing to generate.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zip the header with one row into its field list.
    ///
    /// Cells past the end of the header are ignored; a row shorter than the
    /// header yields empty values for the missing columns.
    pub fn fields(&self, row: &[Cell]) -> Vec<Field> {
        row_fields(&self.headers, row)
    }
}

/// Free-standing form of [`Table::fields`].
pub fn row_fields(headers: &[String], row: &[Cell]) -> Vec<Field> {
    headers
        .iter()
        .enumerate()
        .map(|(i, label)| Field {
            label: label.clone(),
            value: row.get(i).map(Cell::display).unwrap_or_default(),
        })
        .collect()
}

/// One (label, value) pair ready to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl Field {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }

    /// Fields with neither a label nor a value are never drawn.
    pub fn is_empty(&self) -> bool {
        self.label.is_empty() && self.value.is_empty()
    }

    /// The label as drawn: `"SKU :"`, or nothing for an unlabeled column.
    pub fn label_text(&self) -> String {
        if self.label.is_empty() {
            String::new()
        } else {
            format!("{} :", self.label)
        }
    }
}

/// Which of the top corner regions appear on each label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    LogoOnly,
    CodeOnly,
    #[default]
    Both,
}

impl DisplayMode {
    pub fn shows_logo(&self) -> bool {
        matches!(self, DisplayMode::LogoOnly | DisplayMode::Both)
    }

    pub fn shows_code(&self) -> bool {
        matches!(self, DisplayMode::CodeOnly | DisplayMode::Both)
    }
}

/// An axis-aligned box in page coordinates (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A fixed line of text: the label title or the footer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixedText {
    pub text: String,
    pub font_family: String,
    pub font_weight: u32,
    pub font_size: f64,
    /// Baseline distance from the top edge (title) or bottom edge (footer).
    pub offset: f64,
}

impl Default for FixedText {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: default_family(),
            font_weight: 700,
            font_size: 12.0,
            offset: 30.0,
        }
    }
}

fn default_family() -> String {
    "Helvetica".to_string()
}

/// QR error-correction preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

/// Largest accepted pixels-per-module for code rasters.
pub const MAX_CODE_SCALE: u32 = 64;
/// Largest accepted quiet zone, in modules.
pub const MAX_CODE_MARGIN: u32 = 64;

/// Parameters for the code-image generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeOptions {
    pub error_correction: ErrorCorrection,
    /// Quiet zone around the symbol, in modules.
    pub margin: u32,
    /// Pixels per module in the generated raster.
    pub scale: u32,
}

impl Default for CodeOptions {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::M,
            margin: 0,
            scale: 3,
        }
    }
}

/// The compact two-column region for the trailing fields of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    /// How many trailing fields render in the grid. Zero disables it.
    pub field_count: usize,
    /// Share of the content width given to the left column.
    pub left_ratio: f64,
    /// Horizontal space between the two columns.
    pub column_gap: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            field_count: 0,
            left_ratio: 0.6,
            column_gap: 8.0,
        }
    }
}

/// Label geometry and content for one generation run.
///
/// All lengths are PDF points (1/72 inch); y grows downward from the top
/// edge, matching how the regions are described.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub body_font_size: f64,
    pub body_font_family: String,
    pub line_spacing: f64,
    pub label_gap: f64,
    pub display_mode: DisplayMode,
    pub grid: GridConfig,
    pub title: FixedText,
    pub footer: FixedText,
    pub logo_box: Rect,
    /// Edge length of the square code region, anchored to the top-right margin.
    pub code_size: f64,
    pub code_top: f64,
    pub code: CodeOptions,
    /// Baseline of the first body line on every page.
    pub body_top: f64,
    /// Space kept clear above the bottom edge for the footer.
    pub footer_reserve: f64,
    /// Origin used to build the URL embedded in the code.
    pub base_url: String,
}

/// 6 × 4 inches at 72 points per inch, landscape.
pub const LABEL_WIDTH: f64 = 6.0 * 72.0;
pub const LABEL_HEIGHT: f64 = 4.0 * 72.0;

pub const DEFAULT_BASE_URL: &str = "https://your-vercel.app";

impl Default for LayoutConfig {
    fn default() -> Self {
        let margin = 36.0;
        Self {
            page_width: LABEL_WIDTH,
            page_height: LABEL_HEIGHT,
            margin,
            body_font_size: 10.0,
            body_font_family: default_family(),
            line_spacing: 12.0,
            label_gap: 8.0,
            display_mode: DisplayMode::Both,
            grid: GridConfig::default(),
            title: FixedText {
                text: "PALLET TAG".to_string(),
                font_family: default_family(),
                font_weight: 700,
                font_size: 12.0,
                offset: 30.0,
            },
            footer: FixedText {
                text: "MADE IN PAKISTAN".to_string(),
                font_family: default_family(),
                font_weight: 700,
                font_size: 8.0,
                offset: 30.0,
            },
            logo_box: Rect::new(margin, 20.0, 50.0, 50.0),
            code_size: 50.0,
            code_top: 20.0,
            code: CodeOptions::default(),
            body_top: 90.0,
            footer_reserve: 60.0,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl LayoutConfig {
    /// Width available to body content between the side margins.
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    /// The code region: top-right corner, inside the right margin.
    pub fn code_box(&self) -> Rect {
        Rect::new(
            self.page_width - self.code_size - self.margin,
            self.code_top,
            self.code_size,
            self.code_size,
        )
    }

    /// The cursor may not pass this line before a new field starts.
    pub fn body_limit(&self) -> f64 {
        self.page_height - self.footer_reserve
    }

    /// Reject geometry that can't describe a page.
    pub fn validate(&self) -> Result<()> {
        if !(self.page_width > 0.0 && self.page_height > 0.0) {
            return Err(TagError::Config(format!(
                "page size must be positive, got {}x{}",
                self.page_width, self.page_height
            )));
        }
        if self.margin < 0.0 || 2.0 * self.margin >= self.page_width {
            return Err(TagError::Config(format!(
                "margin {} doesn't leave room for content on a {}pt wide page",
                self.margin, self.page_width
            )));
        }
        if !(self.body_font_size > 0.0) || !(self.line_spacing > 0.0) {
            return Err(TagError::Config(
                "bodyFontSize and lineSpacing must be positive".to_string(),
            ));
        }
        if !(self.grid.left_ratio > 0.0 && self.grid.left_ratio < 1.0) {
            return Err(TagError::Config(format!(
                "grid.leftRatio must be between 0 and 1, got {}",
                self.grid.left_ratio
            )));
        }
        if !(1..=MAX_CODE_SCALE).contains(&self.code.scale) {
            return Err(TagError::Config(format!(
                "code.scale must be between 1 and {}, got {}",
                MAX_CODE_SCALE, self.code.scale
            )));
        }
        if self.code.margin > MAX_CODE_MARGIN {
            return Err(TagError::Config(format!(
                "code.margin must be at most {}, got {}",
                MAX_CODE_MARGIN, self.code.margin
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_six_by_four_landscape() {
        let config = LayoutConfig::default();
        assert_eq!(config.page_width, 432.0);
        assert_eq!(config.page_height, 288.0);
        assert_eq!(config.code_box().x, 432.0 - 50.0 - 36.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_config_uses_defaults() {
        let config: LayoutConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn test_partial_json_config_overrides_fields() {
        let config: LayoutConfig = serde_json::from_str(
            r#"{ "displayMode": "logoOnly", "lineSpacing": 13, "grid": { "fieldCount": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.display_mode, DisplayMode::LogoOnly);
        assert_eq!(config.line_spacing, 13.0);
        assert_eq!(config.grid.field_count, 4);
        assert!((config.grid.left_ratio - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_grid_ratio_rejected() {
        let mut config = LayoutConfig::default();
        config.grid.left_ratio = 1.0;
        assert!(matches!(config.validate(), Err(TagError::Config(_))));
    }

    #[test]
    fn test_code_raster_bounds_rejected() {
        let mut config = LayoutConfig::default();
        config.code.scale = u32::MAX;
        assert!(matches!(config.validate(), Err(TagError::Config(_))));
        config.code.scale = 0;
        assert!(matches!(config.validate(), Err(TagError::Config(_))));
        config.code.scale = MAX_CODE_SCALE;
        assert!(config.validate().is_ok());
        config.code.margin = MAX_CODE_MARGIN + 1;
        assert!(matches!(config.validate(), Err(TagError::Config(_))));
    }

    #[test]
    fn test_cells_deserialize_from_json_values() {
        let row: Row = serde_json::from_str(r#"["ABC", 50, null, 1.5, true]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Cell::Text("ABC".into()),
                Cell::Number(50.0),
                Cell::Empty,
                Cell::Number(1.5),
                Cell::Bool(true),
            ]
        );
    }

    #[test]
    fn test_integral_numbers_display_without_fraction() {
        assert_eq!(Cell::Number(50.0).display(), "50");
        assert_eq!(Cell::Number(-3.0).display(), "-3");
        assert_eq!(Cell::Number(1.25).display(), "1.25");
        assert_eq!(Cell::Empty.display(), "");
    }

    #[test]
    fn test_fields_pad_short_rows_and_ignore_extra_cells() {
        let table = Table {
            headers: vec!["SKU".into(), "QTY".into()],
            rows: vec![],
        };
        let short = table.fields(&[Cell::from("A1")]);
        assert_eq!(short, vec![Field::new("SKU", "A1"), Field::new("QTY", "")]);

        let long = table.fields(&[Cell::from("A1"), Cell::from(2i64), Cell::from("x")]);
        assert_eq!(long.len(), 2);
        assert_eq!(long[1].value, "2");
    }

    #[test]
    fn test_label_text_has_separator_only_when_labeled() {
        assert_eq!(Field::new("SKU", "A").label_text(), "SKU :");
        assert_eq!(Field::new("", "A").label_text(), "");
    }

    #[test]
    fn test_display_mode_regions() {
        assert!(DisplayMode::Both.shows_logo() && DisplayMode::Both.shows_code());
        assert!(!DisplayMode::LogoOnly.shows_code());
        assert!(!DisplayMode::CodeOnly.shows_logo());
    }
}
