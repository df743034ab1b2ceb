//! Scan result view: what a phone shows after reading a label's code.

use std::fmt;

use crate::model::Field;
use crate::payload::decode_payload;

pub const INVALID_DATA: &str = "Invalid or missing data.";

/// Decoded contents of a scanned code, or the invalid state.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanView {
    Tag {
        title: String,
        page: u32,
        fields: Vec<Field>,
    },
    Invalid,
}

impl ScanView {
    /// Decode a scanned URL, bare parameter value or raw JSON. Anything that
    /// doesn't decode becomes [`ScanView::Invalid`].
    pub fn from_scan(input: &str, title: &str) -> Self {
        match decode_payload(input) {
            Ok(payload) => ScanView::Tag {
                title: title.to_string(),
                page: payload.page,
                fields: payload.fields(),
            },
            Err(e) => {
                log::debug!("scan rejected: {}", e);
                ScanView::Invalid
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ScanView::Tag { .. })
    }
}

impl fmt::Display for ScanView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanView::Invalid => write!(f, "{}", INVALID_DATA),
            ScanView::Tag { title, page, fields } => {
                write!(f, "{} — Page {}", title, page)?;
                for field in fields {
                    write!(f, "\n{}: {}", field.label, field.value)?;
                }
                Ok(())
            }
        }
    }
}
