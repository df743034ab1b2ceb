//! # Font Management
//!
//! Text measurement for layout and font selection for the PDF writer.
//!
//! Labels are drawn with the standard PDF fonts (Helvetica, Courier), which
//! every viewer ships and which never need embedding. Unknown families fall
//! back to Helvetica so a typo in a config never blocks a run.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

/// A font registry that maps font family + weight + style to a standard font.
pub struct FontRegistry {
    fonts: HashMap<FontKey, StandardFont>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
    pub italic: bool,
}

impl FontKey {
    /// Normalize to the registry's key: weight snapped to 400 or 700.
    pub fn new(family: &str, weight: u32, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            weight: snap_weight(weight),
            italic,
        }
    }
}

fn snap_weight(weight: u32) -> u32 {
    if weight >= 600 {
        700
    } else {
        400
    }
}

/// The standard PDF fonts available for labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        let standard_mappings = vec![
            (("Helvetica", 400, false), StandardFont::Helvetica),
            (("Helvetica", 700, false), StandardFont::HelveticaBold),
            (("Helvetica", 400, true), StandardFont::HelveticaOblique),
            (("Helvetica", 700, true), StandardFont::HelveticaBoldOblique),
            (("Courier", 400, false), StandardFont::Courier),
            (("Courier", 700, false), StandardFont::CourierBold),
            (("Courier", 400, true), StandardFont::CourierOblique),
            (("Courier", 700, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, weight, italic), font) in standard_mappings {
            fonts.insert(FontKey::new(family, weight, italic), font);
        }

        Self { fonts }
    }

    /// Look up a font, falling back to Helvetica if the family is unknown.
    pub fn resolve(&self, family: &str, weight: u32, italic: bool) -> StandardFont {
        if let Some(font) = self.fonts.get(&FontKey::new(family, weight, italic)) {
            return *font;
        }
        match (snap_weight(weight), italic) {
            (700, false) => StandardFont::HelveticaBold,
            (700, true) => StandardFont::HelveticaBoldOblique,
            (_, true) => StandardFont::HelveticaOblique,
            _ => StandardFont::Helvetica,
        }
    }
}

/// Shared font context used by layout and PDF serialization.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(
        &self,
        ch: char,
        family: &str,
        weight: u32,
        italic: bool,
        font_size: f64,
    ) -> f64 {
        self.registry
            .resolve(family, weight, italic)
            .metrics()
            .char_width(ch, font_size)
    }

    /// Measure the width of a string in points.
    pub fn measure_string(
        &self,
        text: &str,
        family: &str,
        weight: u32,
        italic: bool,
        font_size: f64,
    ) -> f64 {
        self.registry
            .resolve(family, weight, italic)
            .metrics()
            .measure_string(text, font_size, 0.0)
    }

    /// Resolve a font key to the standard font that will be drawn.
    pub fn resolve(&self, family: &str, weight: u32, italic: bool) -> StandardFont {
        self.registry.resolve(family, weight, italic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', "Helvetica", 400, false, 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.measure_string("Quantity", "Helvetica", 400, false, 12.0);
        let bold = ctx.measure_string("Quantity", "Helvetica", 700, false, 12.0);
        assert!(bold > regular, "Bold text should be wider than regular");
    }

    #[test]
    fn test_font_context_measure_string() {
        let ctx = FontContext::new();
        // P(667) A(667) L(556) L(556) E(667) T(611) = 3724
        let w = ctx.measure_string("PALLET", "Helvetica", 400, false, 10.0);
        assert!((w - 37.24).abs() < 1e-9);
    }

    #[test]
    fn test_font_context_fallback() {
        let ctx = FontContext::new();
        let w1 = ctx.char_width('A', "Helvetica", 400, false, 12.0);
        let w2 = ctx.char_width('A', "UnknownFont", 400, false, 12.0);
        assert!((w1 - w2).abs() < 0.001);
        assert_eq!(ctx.resolve("Nope", 700, false), StandardFont::HelveticaBold);
    }

    #[test]
    fn test_font_context_weight_resolution() {
        let ctx = FontContext::new();
        assert_eq!(ctx.resolve("Helvetica", 800, false), StandardFont::HelveticaBold);
        assert_eq!(ctx.resolve("Helvetica", 500, false), StandardFont::Helvetica);
        assert_eq!(ctx.resolve("Courier", 700, true), StandardFont::CourierBoldOblique);
    }
}
