//! Structured error types for tagpress.
//!
//! Layout itself never fails. These variants cover the things around it:
//! reading input, decoding assets, decoding scanned payloads, and writing
//! the finished PDF.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TagError>;

/// The unified error type returned by public tagpress functions.
#[derive(Debug, Error)]
pub enum TagError {
    /// JSON input (cell matrix or layout config) failed to parse.
    #[error("Failed to parse input: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// The spreadsheet could not be opened or read.
    #[error("Ingest error: {0}")]
    Ingest(String),
    /// The layout configuration is unusable.
    #[error("Config error: {0}")]
    Config(String),
    /// A logo (or other raster asset) could not be loaded or decoded.
    #[error("Image error: {0}")]
    Image(String),
    /// The machine-readable code could not be generated.
    #[error("Code error: {0}")]
    Code(String),
    /// A scanned payload could not be decoded.
    #[error("Payload error: {0}")]
    Payload(String),
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// PDF generation failed.
    #[error("Render error: {0}")]
    Render(String),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for TagError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't have the expected shape. A cell matrix is an array of arrays of strings, numbers or nulls; a layout config is an object of camelCase fields.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input — is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        TagError::Parse { source: e, hint }
    }
}
