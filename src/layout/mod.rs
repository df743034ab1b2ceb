//! # Label Layout Engine
//!
//! Maps one table row onto one or more fixed-size label pages.
//!
//! Every page carries the same fixed regions: logo top-left, title
//! top-center, code top-right, footer bottom-center. Between them the row's
//! fields flow top to bottom as `LABEL : value` lines, values wrapped to the
//! space right of their label. An optional grid packs the trailing fields
//! into a two-column band just above the footer.
//!
//! ## Overflow
//!
//! A field is never split across pages. The cursor tracks the baseline of
//! the next line. Before a field is drawn, if the cursor has already passed
//! the body limit (`pageHeight − footerReserve − gridBand`), the page is
//! closed and a continuation page opens with the fixed regions re-rendered
//! and the cursor back at `bodyTop`. The field that crossed the limit always
//! finishes on the page it started on, and the first field on a page is
//! always drawn, so layout terminates for any input.
//!
//! Layout never fails. Long text wraps; a missing logo or a code that can't
//! be generated leaves its region empty.

pub mod grid;

use crate::code::CodeGenerator;
use crate::font::FontContext;
use crate::image_loader::LoadedImage;
use crate::model::{row_fields, Cell, Field, FixedText, LayoutConfig, Rect};
use crate::payload::Payload;
use crate::text::TextLayout;

use grid::GridPlan;

/// Weight used for field labels.
pub const LABEL_WEIGHT: u32 = 700;
/// Weight used for field values.
pub const VALUE_WEIGHT: u32 = 400;

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    /// 1-based index of the row this page belongs to.
    pub row_number: u32,
    /// 0 for the row's first page, 1.. for continuation pages.
    pub continuation: usize,
    pub elements: Vec<LayoutElement>,
}

impl LayoutPage {
    /// Elements belonging to one region, in draw order.
    pub fn region(&self, region: Region) -> impl Iterator<Item = &LayoutElement> {
        self.elements.iter().filter(move |e| e.region == region)
    }

    /// All text lines on the page, in draw order.
    pub fn text_lines(&self) -> impl Iterator<Item = &TextLine> {
        self.elements.iter().flat_map(|e| match &e.draw {
            DrawCommand::Text { lines } => lines.as_slice(),
            DrawCommand::Image { .. } => &[],
        })
    }
}

/// Which part of the label an element was drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Logo,
    Title,
    Code,
    Body,
    Grid,
    Footer,
}

/// A positioned element on a page.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Position of the top-left corner (images) or of the first line's
    /// baseline start (text), y measured down from the top edge.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
    pub region: Region,
    /// Header column this element renders, for body and grid text.
    pub field: Option<usize>,
}

/// What to actually draw for this element.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Draw text.
    Text { lines: Vec<TextLine> },
    /// Draw an image scaled into the element's box.
    Image {
        image_data: LoadedImage,
    },
}

/// One line of text at an absolute baseline position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f64,
    /// Baseline, measured down from the top edge.
    pub y: f64,
    pub text: String,
    pub width: f64,
    pub font_family: String,
    pub font_weight: u32,
    pub font_size: f64,
}

/// A field's label and value lines, measured but not yet positioned.
pub(crate) struct MeasuredField {
    pub label: String,
    pub label_width: f64,
    pub lines: Vec<crate::text::BrokenLine>,
}

impl MeasuredField {
    /// Lines the field occupies: wrapped value lines, at least one.
    pub fn line_count(&self) -> usize {
        self.lines.len().max(1)
    }
}

/// The main layout engine.
pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
    font_context: &'a FontContext,
    codes: &'a dyn CodeGenerator,
    text_layout: TextLayout,
}

/// Per-row state shared by every page the row produces.
struct RowContext<'r> {
    row_number: u32,
    payload_url: String,
    logo: Option<&'r LoadedImage>,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(
        config: &'a LayoutConfig,
        font_context: &'a FontContext,
        codes: &'a dyn CodeGenerator,
    ) -> Self {
        Self {
            config,
            font_context,
            codes,
            text_layout: TextLayout::new(),
        }
    }

    /// Lay out one row. Returns at least one page.
    ///
    /// `row_number` is the 1-based row index; it is what the code encodes on
    /// every page of the row, continuation pages included.
    pub fn layout_row(
        &self,
        row_number: u32,
        headers: &[String],
        row: &[Cell],
        logo: Option<&LoadedImage>,
    ) -> Vec<LayoutPage> {
        let config = self.config;
        let ctx = RowContext {
            row_number,
            payload_url: Payload::from_row(row_number, headers, row).to_url(&config.base_url),
            logo,
        };

        let drawable: Vec<(usize, Field)> = row_fields(headers, row)
            .into_iter()
            .enumerate()
            .filter(|(_, f)| !f.is_empty())
            .collect();

        let split = drawable.len().saturating_sub(config.grid.field_count);
        let (body, grid_fields) = drawable.split_at(split);
        let grid = (!grid_fields.is_empty()).then(|| {
            GridPlan::plan(grid_fields, config, self.font_context, &self.text_layout)
        });
        let band_height = grid.as_ref().map_or(0.0, |g| g.band_height);
        let limit = config.body_limit() - band_height;

        let mut pages = Vec::new();
        let mut page = self.open_page(&ctx, 0);
        let mut cursor = config.body_top;
        let mut page_has_fields = false;

        for (index, field) in body {
            if page_has_fields && cursor > limit {
                log::debug!(
                    "row {}: cursor {:.1} past limit {:.1}, continuing on page {}",
                    row_number,
                    cursor,
                    limit,
                    page.continuation + 1
                );
                let next = page.continuation + 1;
                pages.push(self.close_page(page));
                page = self.open_page(&ctx, next);
                cursor = config.body_top;
            }
            cursor = self.place_field(&mut page, *index, field, cursor);
            page_has_fields = true;
        }

        if let Some(grid) = grid {
            // The band never shares vertical space with a body field.
            if page_has_fields && cursor > limit {
                let next = page.continuation + 1;
                pages.push(self.close_page(page));
                page = self.open_page(&ctx, next);
            }
            page.elements.extend(grid.place(limit));
        }

        pages.push(self.close_page(page));
        log::debug!("row {}: {} page(s)", row_number, pages.len());
        pages
    }

    /// Start a page with logo, title and code drawn.
    fn open_page(&self, ctx: &RowContext<'_>, continuation: usize) -> LayoutPage {
        let config = self.config;
        let mut page = LayoutPage {
            width: config.page_width,
            height: config.page_height,
            row_number: ctx.row_number,
            continuation,
            elements: Vec::new(),
        };

        if config.display_mode.shows_logo() {
            if let Some(logo) = ctx.logo {
                page.elements
                    .push(image_element(config.logo_box, logo.clone(), Region::Logo));
            }
        }

        page.elements.push(self.centered_text(
            &config.title,
            config.title.offset,
            Region::Title,
        ));

        if config.display_mode.shows_code() {
            match self.codes.generate(&ctx.payload_url, &config.code) {
                Ok(image) => page
                    .elements
                    .push(image_element(config.code_box(), image, Region::Code)),
                Err(e) => log::warn!(
                    "row {}: code region omitted: {}",
                    ctx.row_number,
                    e
                ),
            }
        }

        page
    }

    /// Draw the footer; it goes on every page.
    fn close_page(&self, mut page: LayoutPage) -> LayoutPage {
        let footer = &self.config.footer;
        let baseline = self.config.page_height - footer.offset;
        page.elements
            .push(self.centered_text(footer, baseline, Region::Footer));
        page
    }

    /// Draw one body field at `cursor`; returns the cursor after it.
    fn place_field(&self, page: &mut LayoutPage, index: usize, field: &Field, cursor: f64) -> f64 {
        let config = self.config;
        let measured = measure_field(
            config,
            self.font_context,
            &self.text_layout,
            field,
            config.content_width(),
        );
        let value_x = config.margin + measured.label_width + config.label_gap;
        page.elements.extend(field_elements(
            config,
            &measured,
            config.margin,
            value_x,
            cursor,
            Region::Body,
            index,
        ));
        cursor + config.line_spacing * measured.line_count() as f64
    }

    fn centered_text(&self, fixed: &FixedText, baseline: f64, region: Region) -> LayoutElement {
        let width = self.text_layout.measure_width(
            self.font_context,
            &fixed.text,
            fixed.font_size,
            &fixed.font_family,
            fixed.font_weight,
        );
        let x = self.config.page_width / 2.0 - width / 2.0;
        LayoutElement {
            x,
            y: baseline,
            width,
            height: fixed.font_size,
            draw: DrawCommand::Text {
                lines: vec![TextLine {
                    x,
                    y: baseline,
                    text: fixed.text.clone(),
                    width,
                    font_family: fixed.font_family.clone(),
                    font_weight: fixed.font_weight,
                    font_size: fixed.font_size,
                }],
            },
            region,
            field: None,
        }
    }
}

/// Measure a field's label and wrap its value into what's left of `column_width`.
pub(crate) fn measure_field(
    config: &LayoutConfig,
    font_context: &FontContext,
    text_layout: &TextLayout,
    field: &Field,
    column_width: f64,
) -> MeasuredField {
    let label = field.label_text();
    let label_width = if label.is_empty() {
        0.0
    } else {
        text_layout.measure_width(
            font_context,
            &label,
            config.body_font_size,
            &config.body_font_family,
            LABEL_WEIGHT,
        )
    };
    let available = column_width - label_width - config.label_gap;
    let lines = if field.value.is_empty() {
        Vec::new()
    } else {
        text_layout.break_into_lines(
            font_context,
            &field.value,
            available,
            config.body_font_size,
            &config.body_font_family,
            VALUE_WEIGHT,
        )
    };
    MeasuredField {
        label,
        label_width,
        lines,
    }
}

/// Label and value elements for a measured field with its first baseline at `top`.
pub(crate) fn field_elements(
    config: &LayoutConfig,
    measured: &MeasuredField,
    label_x: f64,
    value_x: f64,
    top: f64,
    region: Region,
    index: usize,
) -> Vec<LayoutElement> {
    let mut elements = Vec::with_capacity(2);
    let size = config.body_font_size;
    let family = &config.body_font_family;

    if !measured.label.is_empty() {
        elements.push(LayoutElement {
            x: label_x,
            y: top,
            width: measured.label_width,
            height: size,
            draw: DrawCommand::Text {
                lines: vec![TextLine {
                    x: label_x,
                    y: top,
                    text: measured.label.clone(),
                    width: measured.label_width,
                    font_family: family.clone(),
                    font_weight: LABEL_WEIGHT,
                    font_size: size,
                }],
            },
            region,
            field: Some(index),
        });
    }

    if !measured.lines.is_empty() {
        let lines: Vec<TextLine> = measured
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| TextLine {
                x: value_x,
                y: top + config.line_spacing * i as f64,
                text: line.text.clone(),
                width: line.width,
                font_family: family.clone(),
                font_weight: VALUE_WEIGHT,
                font_size: size,
            })
            .collect();
        let width = lines.iter().map(|l| l.width).fold(0.0, f64::max);
        elements.push(LayoutElement {
            x: value_x,
            y: top,
            width,
            height: config.line_spacing * lines.len() as f64,
            draw: DrawCommand::Text { lines },
            region,
            field: Some(index),
        });
    }

    elements
}

fn image_element(rect: Rect, image: LoadedImage, region: Region) -> LayoutElement {
    LayoutElement {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        draw: DrawCommand::Image { image_data: image },
        region,
        field: None,
    }
}
