//! Numeric normalization.
//!
//! Every representation a provider may hand back is resolved through
//! [`normalize`] into a single `f64`. Values that cannot be represented
//! as a finite double come back as [`NormalizedValue::Unavailable`];
//! they are never replaced by zero.

use crate::types::{NormalizedValue, RawValue};

/// Convert a raw provider value into a finite `f64`, or `Unavailable`.
pub fn normalize(raw: &RawValue) -> NormalizedValue {
    let value = match raw {
        RawValue::Int32(v) => f64::from(*v),
        RawValue::Int64(v) => *v as f64,
        RawValue::UInt64(v) => *v as f64,
        RawValue::Double(v) => *v,
        RawValue::WideInt { low, high } => wide_to_i64(*low, *high) as f64,
        RawValue::Decimal(text) => match parse_decimal(text) {
            Some(v) => v,
            None => return NormalizedValue::Unavailable,
        },
        RawValue::Unrecognized => return NormalizedValue::Unavailable,
    };

    if value.is_finite() {
        NormalizedValue::Number(value)
    } else {
        NormalizedValue::Unavailable
    }
}

fn wide_to_i64(low: u32, high: i32) -> i64 {
    (i64::from(high) << 32) | i64::from(low)
}

/// Parse the string form of a decimal. Rejects the textual spellings of
/// NaN and infinity that `f64::from_str` would otherwise accept.
fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    let digits = text.trim_start_matches(['+', '-']);
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok()
}
