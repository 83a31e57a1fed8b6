//! Best-effort typing of text field values.
//!
//! [`coerce`] tries, in order and each behind its own config switch:
//!
//! 1. JSON, when the trimmed value is bracketed by `{}` or `[]`
//! 2. boolean, for the exact literals `true` and `false`
//! 3. number, for a complete decimal literal or `NaN` / `Infinity` / `-Infinity`
//! 4. the original string
//!
//! Coercion is total: any parse failure falls through to the next step, and
//! the original string is the last resort.
//!
//! ```rust
//! use ingest::{coerce, IngestConfig, ParsedValue};
//!
//! let cfg = IngestConfig::default();
//! assert_eq!(coerce("25", &cfg), ParsedValue::Number(25.0));
//! assert_eq!(coerce("true", &cfg), ParsedValue::Boolean(true));
//! assert_eq!(coerce("1", &cfg), ParsedValue::Number(1.0));
//! assert_eq!(coerce("{oops", &cfg), ParsedValue::String("{oops".into()));
//! ```
use crate::config::IngestConfig;
use crate::types::ParsedValue;

/// Converts a raw field value into its richest supported type.
pub fn coerce(raw: &str, cfg: &IngestConfig) -> ParsedValue {
    if cfg.auto_parse_json {
        if let Some(value) = parse_json_structure(raw) {
            return ParsedValue::Json(value);
        }
    }

    if cfg.auto_parse_booleans {
        if let Some(b) = parse_boolean(raw) {
            return ParsedValue::Boolean(b);
        }
    }

    if cfg.auto_parse_numbers {
        if let Some(n) = parse_number(raw) {
            return ParsedValue::Number(n);
        }
    }

    ParsedValue::String(raw.to_owned())
}

/// Parses objects and arrays only; bare JSON scalars are left to the later steps.
fn parse_json_structure(raw: &str) -> Option<serde_json::Value> {
    let trimmed = raw.trim();
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if !bracketed {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

fn parse_boolean(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Accepts `[+-]digits[.digits][(e|E)[+-]digits]` after trimming ASCII
/// whitespace, plus the special literals `NaN`, `Infinity`, `+Infinity` and
/// `-Infinity`.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    match trimmed {
        "" => return None,
        "NaN" => return Some(f64::NAN),
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if !is_decimal_literal(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}
