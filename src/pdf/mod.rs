//! # PDF Serializer
//!
//! Takes the laid-out label pages and writes a PDF file.
//!
//! This is a from-scratch PDF 1.7 writer covering exactly what a label
//! needs: standard Type1 text fonts, image XObjects and an Info dictionary.
//! Standard fonts are never embedded, so the output stays small and
//! deterministic.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, streams
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Layout measures y downward from the top edge; PDF user space grows
//! upward from the bottom, so every y is flipped against the page height
//! here and nowhere else.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use crate::error::{Result, TagError};
use crate::font::{FontContext, StandardFont};
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::layout::{DrawCommand, LayoutPage, TextLine};
use miniz_oxide::deflate::compress_to_vec_zlib;

/// Entries for the document Info dictionary.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
}

pub const PRODUCER: &str = concat!("tagpress ", env!("CARGO_PKG_VERSION"));

pub struct PdfWriter;

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Font objects in resource order: `/F0`, `/F1`, ...
    font_objects: Vec<(StandardFont, usize)>,
    /// XObject ids, indexed as `/Im0`, `/Im1`, ...
    image_objects: Vec<usize>,
    /// For each page, the `/ImN` index of each image element in draw order.
    page_images: Vec<Vec<usize>>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::with_capacity(payload.len() + dict.len() + 32);
        let _ = write!(data, "{}\nstream\n", dict);
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector, one PDF page per layout page.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        info: &DocumentInfo,
        font_context: &FontContext,
    ) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(TagError::Render("document has no pages".to_string()));
        }

        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            image_objects: Vec::new(),
            page_images: Vec::new(),
        };

        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        builder.push(vec![]);
        builder.push(vec![]);
        builder.push(vec![]);

        self.register_fonts(&mut builder, pages, font_context);
        self.register_images(&mut builder, pages);

        let font_resources = self.build_font_resource_dict(&builder.font_objects);
        let mut page_obj_ids: Vec<usize> = Vec::with_capacity(pages.len());

        for (page_idx, page) in pages.iter().enumerate() {
            let content = self.build_content_stream_for_page(page, page_idx, &builder, font_context);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_obj_id = builder.push_stream(
                &format!("<< /Length {} /Filter /FlateDecode >>", compressed.len()),
                &compressed,
            );

            let xobject_resources = self.build_xobject_resource_dict(page_idx, &builder);
            let resources = if xobject_resources.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                format!("/Font << {} >> /XObject << {} >>", font_resources, xobject_resources)
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info_dict = String::from("<< ");
        if let Some(ref title) = info.title {
            let _ = write!(info_dict, "/Title ({}) ", encode_text(title));
        }
        let _ = write!(info_dict, "/Producer ({}) /Creator (tagpress) >>", PRODUCER);
        let info_obj_id = builder.push(info_dict.into_bytes());

        log::debug!(
            "pdf: {} page(s), {} font(s), {} image(s)",
            pages.len(),
            builder.font_objects.len(),
            builder.image_objects.len()
        );
        Ok(self.serialize(&builder, info_obj_id))
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream_for_page(
        &self,
        page: &LayoutPage,
        page_idx: usize,
        builder: &PdfBuilder,
        font_context: &FontContext,
    ) -> String {
        let mut stream = String::new();
        let page_height = page.height;
        let page_images: &[usize] = builder
            .page_images
            .get(page_idx)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let mut images = page_images.iter();

        for element in &page.elements {
            match &element.draw {
                DrawCommand::Text { lines } => {
                    if lines.is_empty() {
                        continue;
                    }
                    let _ = writeln!(stream, "BT\n0 0 0 rg");
                    for line in lines {
                        self.write_text_line(&mut stream, line, page_height, builder, font_context);
                    }
                    let _ = writeln!(stream, "ET");
                }
                DrawCommand::Image { .. } => {
                    let Some(img_idx) = images.next() else {
                        continue;
                    };
                    let y = page_height - element.y - element.height;
                    let _ = write!(
                        stream,
                        "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                        element.width, element.height, element.x, y, img_idx
                    );
                }
            }
        }

        stream
    }

    fn write_text_line(
        &self,
        stream: &mut String,
        line: &TextLine,
        page_height: f64,
        builder: &PdfBuilder,
        font_context: &FontContext,
    ) {
        let font = font_context.resolve(&line.font_family, line.font_weight, false);
        let font_idx = self.font_index(font, &builder.font_objects);
        let _ = write!(
            stream,
            "/F{} {:.1} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\n",
            font_idx,
            line.font_size,
            line.x,
            page_height - line.y,
            encode_text(&line.text)
        );
    }

    /// Register one font object per standard font actually drawn, in first-use order.
    fn register_fonts(&self, builder: &mut PdfBuilder, pages: &[LayoutPage], font_context: &FontContext) {
        let mut used: Vec<StandardFont> = Vec::new();
        for line in pages.iter().flat_map(|p| p.text_lines()) {
            let font = font_context.resolve(&line.font_family, line.font_weight, false);
            if !used.contains(&font) {
                used.push(font);
            }
        }

        // Always have at least Helvetica
        if used.is_empty() {
            used.push(StandardFont::Helvetica);
        }

        for font in used {
            let font_dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                 /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            let obj_id = builder.push(font_dict.into_bytes());
            builder.font_objects.push((font, obj_id));
        }
    }

    /// Create one XObject per distinct image, page by page.
    ///
    /// The logo repeats on every label and a row's code repeats on its
    /// continuation pages; both are written once and shared.
    fn register_images(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        let mut seen: HashMap<&LoadedImage, usize> = HashMap::new();
        for page in pages {
            let mut on_page = Vec::new();
            for element in &page.elements {
                if let DrawCommand::Image { image_data } = &element.draw {
                    let img_idx = match seen.get(image_data) {
                        Some(&idx) => idx,
                        None => {
                            let idx = builder.image_objects.len();
                            let xobj_id = Self::write_image_xobject(builder, image_data);
                            builder.image_objects.push(xobj_id);
                            seen.insert(image_data, idx);
                            idx
                        }
                    };
                    on_page.push(img_idx);
                }
            }
            builder.page_images.push(on_page);
        }
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space_str = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                let dict = format!(
                    "<< /Type /XObject /Subtype /Image \
                     /Width {} /Height {} \
                     /ColorSpace {} \
                     /BitsPerComponent 8 \
                     /Filter /DCTDecode \
                     /Length {} >>",
                    image.width_px,
                    image.height_px,
                    color_space_str,
                    data.len()
                );
                builder.push_stream(&dict, data)
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                let smask_ref = alpha
                    .as_ref()
                    .map(|alpha_data| {
                        let compressed_alpha = compress_to_vec_zlib(alpha_data, 6);
                        let dict = format!(
                            "<< /Type /XObject /Subtype /Image \
                             /Width {} /Height {} \
                             /ColorSpace /DeviceGray \
                             /BitsPerComponent 8 \
                             /Filter /FlateDecode \
                             /Length {} >>",
                            image.width_px,
                            image.height_px,
                            compressed_alpha.len()
                        );
                        let id = builder.push_stream(&dict, &compressed_alpha);
                        format!(" /SMask {} 0 R", id)
                    })
                    .unwrap_or_default();

                let compressed_rgb = compress_to_vec_zlib(rgb, 6);
                let dict = format!(
                    "<< /Type /XObject /Subtype /Image \
                     /Width {} /Height {} \
                     /ColorSpace /DeviceRGB \
                     /BitsPerComponent 8 \
                     /Filter /FlateDecode \
                     /Length {}{} >>",
                    image.width_px,
                    image.height_px,
                    compressed_rgb.len(),
                    smask_ref
                );
                builder.push_stream(&dict, &compressed_rgb)
            }
        }
    }

    /// Build the /XObject resource dict entries for a specific page.
    fn build_xobject_resource_dict(&self, page_idx: usize, builder: &PdfBuilder) -> String {
        builder
            .page_images
            .get(page_idx)
            .map(|indices| {
                let mut unique: Vec<usize> = indices.clone();
                unique.sort_unstable();
                unique.dedup();
                unique
                    .iter()
                    .map(|&idx| format!("/Im{} {} 0 R", idx, builder.image_objects[idx]))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    fn build_font_resource_dict(&self, font_objects: &[(StandardFont, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resource index (/F0, /F1, ...) of a registered font.
    fn font_index(&self, font: StandardFont, font_objects: &[(StandardFont, usize)]) -> usize {
        font_objects
            .iter()
            .position(|(f, _)| *f == font)
            .unwrap_or(0)
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

/// Encode text as the body of a PDF literal string in WinAnsiEncoding.
///
/// Delimiters are escaped, bytes outside printable ASCII become octal
/// escapes, and characters WinAnsi can't represent become `?`.
pub fn encode_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
///
/// WinAnsiEncoding is based on Windows-1252. Most codepoints in
/// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
/// contains special mappings for smart quotes, bullets, dashes, etc.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x0192 => Some(0x83), // Latin small letter f with hook
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86), // Dagger
        0x2021 => Some(0x87), // Double dagger
        0x02C6 => Some(0x88), // Modifier letter circumflex accent
        0x2030 => Some(0x89), // Per mille sign
        0x0160 => Some(0x8A), // Latin capital letter S with caron
        0x2039 => Some(0x8B), // Single left-pointing angle quotation
        0x0152 => Some(0x8C), // Latin capital ligature OE
        0x017D => Some(0x8E), // Latin capital letter Z with caron
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98), // Small tilde
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A), // Latin small letter s with caron
        0x203A => Some(0x9B), // Single right-pointing angle quotation
        0x0153 => Some(0x9C), // Latin small ligature oe
        0x017E => Some(0x9E), // Latin small letter z with caron
        0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutElement, Region};

    fn text_element(text: &str, weight: u32, x: f64, y: f64) -> LayoutElement {
        LayoutElement {
            x,
            y,
            width: 10.0,
            height: 10.0,
            draw: DrawCommand::Text {
                lines: vec![TextLine {
                    x,
                    y,
                    text: text.to_string(),
                    width: 10.0,
                    font_family: "Helvetica".to_string(),
                    font_weight: weight,
                    font_size: 10.0,
                }],
            },
            region: Region::Body,
            field: None,
        }
    }

    fn page(elements: Vec<LayoutElement>) -> LayoutPage {
        LayoutPage {
            width: 432.0,
            height: 288.0,
            row_number: 1,
            continuation: 0,
            elements,
        }
    }

    fn contains(bytes: &[u8], needle: &str) -> bool {
        bytes.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    fn count(bytes: &[u8], needle: &str) -> usize {
        bytes.windows(needle.len()).filter(|w| *w == needle.as_bytes()).count()
    }

    #[test]
    fn test_encode_text_escapes() {
        assert_eq!(encode_text("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(encode_text("back\\slash"), "back\\\\slash");
        assert_eq!(encode_text("café"), "caf\\351");
        assert_eq!(encode_text("€5"), "\\2005");
        assert_eq!(encode_text("日本"), "??");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let bytes = PdfWriter::new()
            .write(&[page(vec![])], &DocumentInfo::default(), &FontContext::new())
            .unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(contains(&bytes, "%%EOF"));
        assert!(contains(&bytes, "xref"));
        assert!(contains(&bytes, "/Count 1"));
        assert!(contains(&bytes, "/MediaBox [0 0 432.00 288.00]"));
    }

    #[test]
    fn test_info_dictionary() {
        let info = DocumentInfo {
            title: Some("inventory (March)".to_string()),
        };
        let bytes = PdfWriter::new()
            .write(&[page(vec![])], &info, &FontContext::new())
            .unwrap();
        assert!(contains(&bytes, "/Title (inventory \\(March\\))"));
        assert!(contains(&bytes, "/Producer (tagpress "));
        assert!(contains(&bytes, "/Info "));
    }

    #[test]
    fn test_bold_font_registered_separately() {
        let pages = vec![page(vec![
            text_element("SKU :", 700, 36.0, 90.0),
            text_element("ABC123", 400, 70.0, 90.0),
            text_element("QTY :", 700, 36.0, 102.0),
        ])];
        let bytes = PdfWriter::new()
            .write(&pages, &DocumentInfo::default(), &FontContext::new())
            .unwrap();
        assert!(contains(&bytes, "/BaseFont /Helvetica-Bold"));
        assert!(contains(&bytes, "/BaseFont /Helvetica "));
        assert_eq!(
            bytes.windows(9).filter(|w| w == b"/BaseFont").count(),
            2
        );
    }

    #[test]
    fn test_text_y_is_flipped() {
        let writer = PdfWriter::new();
        let fonts = FontContext::new();
        let p = page(vec![text_element("ABC123", 400, 70.0, 90.0)]);
        let builder = PdfBuilder {
            objects: vec![],
            font_objects: vec![(StandardFont::Helvetica, 3)],
            image_objects: vec![],
            page_images: vec![vec![]],
        };
        let stream = writer.build_content_stream_for_page(&p, 0, &builder, &fonts);
        assert!(stream.contains("/F0 10.0 Tf\n1 0 0 1 70.00 198.00 Tm\n(ABC123) Tj"));
    }

    #[test]
    fn test_image_xobject_and_placement() {
        let writer = PdfWriter::new();
        let fonts = FontContext::new();
        let img = LayoutElement {
            x: 346.0,
            y: 20.0,
            width: 50.0,
            height: 50.0,
            draw: DrawCommand::Image {
                image_data: LoadedImage::from_gray(2, 2, &[0, 255, 255, 0]),
            },
            region: Region::Code,
            field: None,
        };
        let p = page(vec![img]);
        let bytes = writer
            .write(std::slice::from_ref(&p), &DocumentInfo::default(), &fonts)
            .unwrap();
        assert!(contains(&bytes, "/Subtype /Image /Width 2 /Height 2"));
        assert!(contains(&bytes, "/XObject << /Im0 "));

        let builder = PdfBuilder {
            objects: vec![],
            font_objects: vec![],
            image_objects: vec![7],
            page_images: vec![vec![0]],
        };
        let stream = writer.build_content_stream_for_page(&p, 0, &builder, &fonts);
        assert!(stream.contains("50.0000 0 0 50.0000 346.00 218.00 cm\n/Im0 Do"));
    }

    #[test]
    fn test_repeated_image_is_embedded_once() {
        let logo = LoadedImage::from_gray(2, 2, &[0, 255, 255, 0]);
        let code = LoadedImage::from_gray(1, 1, &[0]);
        let image = |data: &LoadedImage, region| LayoutElement {
            x: 36.0,
            y: 20.0,
            width: 50.0,
            height: 50.0,
            draw: DrawCommand::Image { image_data: data.clone() },
            region,
            field: None,
        };
        let pages: Vec<LayoutPage> = (0..5)
            .map(|_| page(vec![image(&logo, Region::Logo), image(&code, Region::Code)]))
            .collect();
        let bytes = PdfWriter::new()
            .write(&pages, &DocumentInfo::default(), &FontContext::new())
            .unwrap();

        assert_eq!(count(&bytes, "/Subtype /Image"), 2);
        assert_eq!(count(&bytes, "/XObject << /Im0 "), 5);
        assert!(!contains(&bytes, "/Im2 "));
    }

    #[test]
    fn test_zero_pages_is_an_error() {
        let result = PdfWriter::new().write(&[], &DocumentInfo::default(), &FontContext::new());
        assert!(matches!(result, Err(TagError::Render(_))));
    }

    #[test]
    fn test_pages_in_order() {
        let pages = vec![page(vec![]), page(vec![]), page(vec![])];
        let bytes = PdfWriter::new()
            .write(&pages, &DocumentInfo::default(), &FontContext::new())
            .unwrap();
        assert!(contains(&bytes, "/Count 3"));
    }
}
