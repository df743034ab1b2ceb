//! # Text Layout
//!
//! Line breaking and text measurement for label values.
//!
//! Breaks follow UAX#14 opportunities (spaces, hyphens, explicit newlines).
//! A word wider than the whole line is split between characters, so wrapping
//! always terminates and never reports an error.

use crate::font::FontContext;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    /// The text as drawn, trailing spaces removed.
    pub text: String,
    /// Width of `text` in points.
    pub width: f64,
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Returns a vec of length `text.chars().count()`. Each entry is the break
/// opportunity *before* that character position (i.e. "can we break before
/// char[i]?"). Index 0 is always `None` (no break before the first char).
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    // linebreaks() yields (byte_offset, opportunity) where byte_offset is the
    // position AFTER the break, i.e. the start of the next segment.
    let byte_to_char: Vec<usize> = {
        let mut map = vec![0usize; text.len() + 1];
        for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
            map[byte_idx] = char_idx;
        }
        map[text.len()] = char_count;
        map
    };

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
        // byte_offset == text.len() is the break at end of text; ignored
    }

    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub struct TextLayout;

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Break a string into lines that fit within `max_width`.
    ///
    /// Greedy: each line takes as many break-separated segments as fit.
    /// Empty input yields a single empty line.
    pub fn break_into_lines(
        &self,
        font_context: &FontContext,
        text: &str,
        max_width: f64,
        font_size: f64,
        font_family: &str,
        font_weight: u32,
    ) -> Vec<BrokenLine> {
        if text.is_empty() {
            return vec![BrokenLine {
                text: String::new(),
                width: 0.0,
            }];
        }

        let chars: Vec<char> = text.chars().collect();
        let char_widths: Vec<f64> = chars
            .iter()
            .map(|&ch| {
                if is_newline(ch) {
                    0.0
                } else {
                    font_context.char_width(ch, font_family, font_weight, false, font_size)
                }
            })
            .collect();
        let break_opps = compute_break_opportunities(text);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut line_width = 0.0;
        let mut last_break_point: Option<usize> = None;

        for (i, &ch) in chars.iter().enumerate() {
            // A break *before* char[i] means the previous line can end at char[i-1].
            if i > 0 {
                match break_opps[i] {
                    Some(BreakOpportunity::Mandatory) => {
                        lines.push(self.make_line(&chars[line_start..i], &char_widths[line_start..i]));
                        line_start = i;
                        line_width = 0.0;
                        last_break_point = None;
                    }
                    Some(BreakOpportunity::Allowed) => {
                        last_break_point = Some(i - 1);
                    }
                    None => {}
                }
            }

            if is_newline(ch) {
                continue;
            }

            let char_width = char_widths[i];
            if line_width + char_width > max_width && line_start < i {
                if let Some(bp) = last_break_point.filter(|&bp| bp >= line_start) {
                    let break_at = bp + 1;
                    lines.push(self.make_line(
                        &chars[line_start..break_at],
                        &char_widths[line_start..break_at],
                    ));
                    line_start = break_at;
                    line_width = char_widths[line_start..=i].iter().sum();
                    last_break_point = None;
                    continue;
                }

                // No break point on this line, split the word here
                lines.push(self.make_line(&chars[line_start..i], &char_widths[line_start..i]));
                line_start = i;
                line_width = char_width;
                last_break_point = None;
                continue;
            }

            line_width += char_width;
        }

        if line_start < chars.len() {
            lines.push(self.make_line(&chars[line_start..], &char_widths[line_start..]));
        }

        lines
    }

    /// Create a BrokenLine, dropping newline characters and trailing spaces.
    fn make_line(&self, chars: &[char], widths: &[f64]) -> BrokenLine {
        let mut end = chars.len();
        while end > 0 && (chars[end - 1] == ' ' || is_newline(chars[end - 1])) {
            end -= 1;
        }
        let text: String = chars[..end].iter().filter(|c| !is_newline(**c)).collect();
        let width = widths[..end].iter().sum();
        BrokenLine { text, width }
    }

    /// Measure a single-line string in points.
    pub fn measure_width(
        &self,
        font_context: &FontContext,
        text: &str,
        font_size: f64,
        font_family: &str,
        font_weight: u32,
    ) -> f64 {
        font_context.measure_string(text, font_family, font_weight, false, font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FontContext {
        FontContext::new()
    }

    fn wrap(text: &str, max_width: f64) -> Vec<String> {
        TextLayout::new()
            .break_into_lines(&ctx(), text, max_width, 10.0, "Helvetica", 400)
            .into_iter()
            .map(|l| l.text)
            .collect()
    }

    #[test]
    fn test_single_line() {
        let lines = TextLayout::new().break_into_lines(&ctx(), "ABC123", 500.0, 10.0, "Helvetica", 400);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "ABC123");
        assert!(lines[0].width > 0.0);
    }

    #[test]
    fn test_line_break_at_space() {
        // "Hello" is ~22.8pt at 10pt Helvetica; two words can't share 30pt
        assert_eq!(wrap("Hello World", 30.0), vec!["Hello", "World"]);
    }

    #[test]
    fn test_explicit_newline() {
        assert_eq!(wrap("Line one\nLine two", 500.0), vec!["Line one", "Line two"]);
        assert_eq!(wrap("a\r\nb", 500.0), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(wrap("", 100.0), vec![""]);
    }

    #[test]
    fn test_long_word_split_by_characters() {
        let lines = wrap("AAAAAAAAAAAAAAAAAAAA", 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "AAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn test_lines_fit_width() {
        let layout = TextLayout::new();
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let lines = layout.break_into_lines(&ctx(), text, 80.0, 10.0, "Helvetica", 400);
        assert!(lines.len() > 2);
        for line in &lines {
            assert!(line.width <= 80.0 + 1e-9, "{:?} too wide", line);
        }
        let rejoined: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(rejoined.join(" "), text);
    }

    #[test]
    fn test_zero_width_still_terminates() {
        let lines = wrap("abc", 0.0);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_bold_text_wider() {
        let layout = TextLayout::new();
        let regular = layout.measure_width(&ctx(), "SKU :", 10.0, "Helvetica", 400);
        let bold = layout.measure_width(&ctx(), "SKU :", 10.0, "Helvetica", 700);
        assert!(bold > regular);
    }
}
