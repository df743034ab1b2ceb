//! Two-column grid for a row's trailing fields.
//!
//! Cells fill row-major, two per grid row, the left column taking
//! `leftRatio` of the content width (after the column gap). A grid row is as
//! tall as its tallest cell. The whole band sits directly above the footer
//! reserve and is never split across pages.

use super::{field_elements, measure_field, LayoutElement, MeasuredField, Region};
use crate::font::FontContext;
use crate::model::{Field, LayoutConfig};
use crate::text::TextLayout;

/// Left and right column widths for a content width.
pub fn column_widths(content_width: f64, left_ratio: f64, column_gap: f64) -> (f64, f64) {
    let usable = (content_width - column_gap).max(0.0);
    let left = usable * left_ratio;
    (left, usable - left)
}

struct GridCell {
    index: usize,
    x: f64,
    measured: MeasuredField,
}

struct GridRow {
    cells: Vec<GridCell>,
    height: f64,
}

/// Measured grid, ready to place once its band position is known.
pub struct GridPlan {
    rows: Vec<GridRow>,
    /// Vertical space the band takes above the footer reserve.
    pub band_height: f64,
    config: LayoutConfig,
}

impl GridPlan {
    /// Measure `fields` (with their header column indices) into grid rows.
    pub fn plan(
        fields: &[(usize, Field)],
        config: &LayoutConfig,
        font_context: &FontContext,
        text_layout: &TextLayout,
    ) -> Self {
        let (left_w, right_w) = column_widths(
            config.content_width(),
            config.grid.left_ratio,
            config.grid.column_gap,
        );
        let columns = [
            (config.margin, left_w),
            (config.margin + left_w + config.grid.column_gap, right_w),
        ];

        let rows: Vec<GridRow> = fields
            .chunks(2)
            .map(|pair| {
                let cells: Vec<GridCell> = pair
                    .iter()
                    .zip(columns)
                    .map(|((index, field), (x, width))| GridCell {
                        index: *index,
                        x,
                        measured: measure_field(config, font_context, text_layout, field, width),
                    })
                    .collect();
                let tallest = cells
                    .iter()
                    .map(|c| c.measured.line_count())
                    .max()
                    .unwrap_or(1);
                GridRow {
                    cells,
                    height: config.line_spacing * tallest as f64,
                }
            })
            .collect();

        let band_height = rows.iter().map(|r| r.height).sum();
        Self {
            rows,
            band_height,
            config: config.clone(),
        }
    }

    /// Number of grid rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Elements for the band with its first baseline at `top`.
    pub fn place(&self, top: f64) -> Vec<LayoutElement> {
        let mut elements = Vec::new();
        let mut y = top;
        for row in &self.rows {
            for cell in &row.cells {
                let value_x = cell.x + cell.measured.label_width + self.config.label_gap;
                elements.extend(field_elements(
                    &self.config,
                    &cell.measured,
                    cell.x,
                    value_x,
                    y,
                    Region::Grid,
                    cell.index,
                ));
            }
            y += row.height;
        }
        elements
    }
}
