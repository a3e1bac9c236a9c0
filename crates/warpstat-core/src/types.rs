//! Value model for statistics read from a provider.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Whether a metric family only grows over the provider's uptime or
/// reports current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Ever-increasing, counter-like (operation counts, bytes transferred).
    Cumulative,
    /// Gauge-like (open connections, resident memory).
    Instantaneous,
}

/// Identifies one series: the family name plus its label values, in the
/// order the family declares its label names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub family: String,
    pub labels: Vec<String>,
}

impl MetricKey {
    pub fn new(family: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            family: family.into(),
            labels,
        }
    }

    /// Key for a family without labels.
    pub fn unlabeled(family: impl Into<String>) -> Self {
        Self::new(family, Vec::new())
    }

    /// Label values as `&str`, in declaration order.
    pub fn label_values(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            write!(f, "{}", self.family)
        } else {
            write!(f, "{}{{{}}}", self.family, self.labels.join(","))
        }
    }
}

/// A scalar exactly as the provider encoded it.
///
/// This is the closed set of representations the normalizer understands.
/// Anything else decodes to `Unrecognized` rather than being coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int32(i32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    /// A 64-bit integer carried as two 32-bit halves.
    WideInt { low: u32, high: i32 },
    /// An arbitrary-precision decimal carried in its string form.
    Decimal(String),
    Unrecognized,
}

impl RawValue {
    /// Decode a JSON value, including the extended-JSON numeric wrappers
    /// (`$numberInt`, `$numberLong`, `$numberDouble`, `$numberDecimal`)
    /// and `{low, high}` wide integers.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => RawValue::Int32(small),
                        Err(_) => RawValue::Int64(i),
                    }
                } else if let Some(u) = n.as_u64() {
                    RawValue::UInt64(u)
                } else if let Some(f) = n.as_f64() {
                    RawValue::Double(f)
                } else {
                    RawValue::Unrecognized
                }
            }
            Value::Object(map) => Self::from_wrapper(map),
            _ => RawValue::Unrecognized,
        }
    }

    fn from_wrapper(map: &Map<String, Value>) -> Self {
        if map.len() == 1 {
            let (tag, inner) = match map.iter().next() {
                Some(entry) => entry,
                None => return RawValue::Unrecognized,
            };
            let Some(text) = inner.as_str() else {
                return RawValue::Unrecognized;
            };
            return match tag.as_str() {
                "$numberInt" => text
                    .parse()
                    .map(RawValue::Int32)
                    .unwrap_or(RawValue::Unrecognized),
                "$numberLong" => text
                    .parse()
                    .map(RawValue::Int64)
                    .unwrap_or(RawValue::Unrecognized),
                "$numberDouble" => text
                    .parse()
                    .map(RawValue::Double)
                    .unwrap_or(RawValue::Unrecognized),
                "$numberDecimal" => RawValue::Decimal(text.to_string()),
                _ => RawValue::Unrecognized,
            };
        }

        Self::wide_int(map).unwrap_or(RawValue::Unrecognized)
    }

    /// `{low, high}` halves, optionally with a boolean `unsigned` flag.
    /// `low` may be written signed or unsigned; either way it is the raw
    /// lower 32 bits.
    fn wide_int(map: &Map<String, Value>) -> Option<Self> {
        let extra = match map.get("unsigned") {
            Some(Value::Bool(_)) => 1,
            Some(_) => return None,
            None => 0,
        };
        if map.len() != 2 + extra {
            return None;
        }

        let low = map.get("low")?.as_i64()?;
        let high = i32::try_from(map.get("high")?.as_i64()?).ok()?;
        let low = match i32::try_from(low) {
            Ok(signed) => signed as u32,
            Err(_) => u32::try_from(low).ok()?,
        };
        Some(RawValue::WideInt { low, high })
    }
}

/// A raw value after normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedValue {
    /// A finite double.
    Number(f64),
    /// No recognized representation, or not finite.
    Unavailable,
}

impl NormalizedValue {
    pub fn as_number(self) -> Option<f64> {
        match self {
            NormalizedValue::Number(v) => Some(v),
            NormalizedValue::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, NormalizedValue::Number(_))
    }
}

/// One observation read during a poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub key: MetricKey,
    pub raw: RawValue,
    pub kind: MetricKind,
}

/// The nested mapping returned by a stats request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsDocument {
    root: Map<String, Value>,
}

impl StatsDocument {
    /// Wrap a decoded JSON body; anything but an object is malformed.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ProviderError::Decode(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Walk a dotted path of object keys.
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.root.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
