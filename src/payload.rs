//! # Scan Payloads
//!
//! Builds the string embedded in each label's code: a URL on the configured
//! origin whose `d` query parameter carries `{"page": n, "data": {...}}` as
//! percent-encoded JSON. [`decode_payload`] is the inverse used by the
//! scan viewer.
//!
//! Encoding is total. Cell values that JSON can't represent (non-finite
//! numbers) fall back to their string form instead of failing.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TagError};
use crate::model::{format_number, Cell, Field};

/// Path of the scan viewer on the deployment origin.
pub const TAG_ROUTE: &str = "/tag";
/// Query parameter holding the encoded payload.
pub const PAYLOAD_PARAM: &str = "d";

/// Everything except the characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The decoded content of a label's code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// 1-based index of the row the label was generated from.
    pub page: u32,
    /// Row values keyed by column label, in column order.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Payload {
    /// Build the payload for one row.
    pub fn from_row(page: u32, headers: &[String], row: &[Cell]) -> Self {
        let mut data = Map::new();
        for (i, label) in headers.iter().enumerate() {
            let cell = row.get(i).unwrap_or(&Cell::Empty);
            if label.is_empty() && cell.display().is_empty() {
                continue;
            }
            let key = unique_key(&data, label, i);
            data.insert(key, cell_value(cell));
        }
        Self { page, data }
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                // Map<String, Value> always serializes; keep the page if it somehow doesn't.
                log::warn!("payload serialization failed: {}", e);
                format!("{{\"page\":{},\"data\":{{}}}}", self.page)
            }
        }
    }

    /// The full URL embedded in the code.
    pub fn to_url(&self, base_url: &str) -> String {
        format!(
            "{}{}?{}={}",
            base_url.trim_end_matches('/'),
            TAG_ROUTE,
            PAYLOAD_PARAM,
            utf8_percent_encode(&self.to_json(), URI_COMPONENT)
        )
    }

    /// The data entries as drawable fields, in stored order.
    pub fn fields(&self) -> Vec<Field> {
        self.data
            .iter()
            .map(|(k, v)| Field {
                label: k.clone(),
                value: value_text(v),
            })
            .collect()
    }
}

/// Encode one row into the URL embedded in its code.
pub fn encode_payload(base_url: &str, page: u32, headers: &[String], row: &[Cell]) -> String {
    Payload::from_row(page, headers, row).to_url(base_url)
}

/// Decode a scanned payload.
///
/// Accepts a full URL containing the `d` parameter, the bare (still
/// percent-encoded) parameter value, or raw JSON.
pub fn decode_payload(input: &str) -> Result<Payload> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TagError::Payload("missing data".to_string()));
    }

    let json = if input.starts_with('{') {
        input.to_string()
    } else {
        let encoded = match input.split_once('?') {
            Some((_, query)) => query_param(query, PAYLOAD_PARAM)
                .ok_or_else(|| TagError::Payload(format!("no '{}' parameter", PAYLOAD_PARAM)))?,
            None => input,
        };
        let spaced = encoded.replace('+', " ");
        percent_decode_str(&spaced)
            .decode_utf8()
            .map_err(|e| TagError::Payload(format!("payload is not UTF-8: {}", e)))?
            .into_owned()
    };

    serde_json::from_str(&json).map_err(|e| TagError::Payload(e.to_string()))
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    let query = query.split('#').next().unwrap_or(query);
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then_some(value)
    })
}

/// Key for a column: its label, `#<column>` when unlabeled, suffixed when repeated.
fn unique_key(data: &Map<String, Value>, label: &str, index: usize) -> String {
    let base = if label.is_empty() {
        format!("#{}", index + 1)
    } else {
        label.to_string()
    };
    if !data.contains_key(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} ({})", base, n);
        if !data.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::String(String::new()),
        Cell::Bool(b) => Value::Bool(*b),
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
                Value::from(*n as i64)
            } else {
                serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(format_number(*n)))
            }
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        },
        other => other.to_string(),
    }
}
