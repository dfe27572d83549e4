// Licensed under the Apache-2.0 license

use fru_image::FruRecord;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while turning JSON text into a field mapping.
///
/// Only the shape of the document is checked here. Individual field values
/// never fail; they are normalized instead.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON object at the top level, found {0}.")]
    NotAnObject(&'static str),
}

/// Owned field values of a FRU record, before slot encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FruFields {
    pub serial: String,
    pub part: String,
    pub mac: String,
    pub mfg_date: u64,
    pub flags: u64,
}

impl FruFields {
    pub fn from_json_str(contents: &str) -> Result<Self, RecordError> {
        match serde_json::from_str::<Value>(contents)? {
            Value::Object(map) => Ok(Self::from_map(&map)),
            other => Err(RecordError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Reads the known keys out of `map`. Missing or mistyped values fall
    /// back to an empty string or zero; unknown keys are ignored.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            serial: text_field(map, "serial"),
            part: text_field(map, "part"),
            mac: text_field(map, "mac"),
            mfg_date: integer_field(map, "mfg_date"),
            flags: integer_field(map, "flags"),
        }
    }

    pub fn as_record(&self) -> FruRecord<'_> {
        FruRecord {
            serial: &self.serial,
            part: &self.part,
            mac: &self.mac,
            mfg_date: self.mfg_date,
            flags: self.flags,
        }
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn integer_field(map: &Map<String, Value>, key: &str) -> u64 {
    map.get(key).map_or(0, integer_from_value)
}

/// Integer view of a JSON value, reduced modulo 2^64. Negative values keep
/// their two's complement bit pattern so that later masking keeps the same
/// low bits as masking the exact integer would.
fn integer_from_value(value: &Value) -> u64 {
    match value {
        // Numbers keep their source text, so integers of any length reduce
        // exactly; everything else goes through f64.
        Value::Number(n) => integer_from_digits(&n.to_string())
            .or_else(|| n.as_f64().map(integer_from_float))
            .unwrap_or(0),
        Value::Bool(b) => u64::from(*b),
        Value::String(s) => integer_from_digits(s.trim()).unwrap_or(0),
        Value::Null | Value::Array(_) | Value::Object(_) => 0,
    }
}

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

fn integer_from_float(value: f64) -> u64 {
    if !value.is_finite() {
        return 0;
    }
    let value = value.trunc();
    let low = (value.abs() % TWO_POW_64) as u64;
    if value < 0.0 {
        low.wrapping_neg()
    } else {
        low
    }
}

/// Parses signed decimal text, allowing single `_` separators between
/// digits, and reduces it modulo 2^64. Returns `None` for anything else.
fn integer_from_digits(text: &str) -> Option<u64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }

    let mut value = 0u64;
    for c in digits.chars().filter(|&c| c != '_') {
        let digit = c.to_digit(10)?;
        value = value.wrapping_mul(10).wrapping_add(u64::from(digit));
    }
    Some(if negative { value.wrapping_neg() } else { value })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
