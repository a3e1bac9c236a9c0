//! Member descriptor parsing.

use chrono::DateTime;
use serde_json::Value;
use thiserror::Error;

use warpstat_core::{MemberStatus, ProviderError, RawValue, TopologyView, normalize};

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("malformed topology response: {0}")]
    Malformed(String),
}

const PRIMARY_LABEL: &str = "PRIMARY";
const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Parse a `replSetGetStatus`-shaped document into its members, with the
/// primary-equivalent member flagged.
pub fn parse_members(doc: &Value) -> Result<Vec<MemberStatus>, TopologyError> {
    let entries = doc
        .get("members")
        .and_then(Value::as_array)
        .ok_or_else(|| TopologyError::Malformed("missing members array".to_string()))?;
    if entries.is_empty() {
        return Err(TopologyError::Malformed("members array is empty".to_string()));
    }

    let mut members = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| parse_member(idx, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let primary = members
        .iter()
        .position(|m| m.state.eq_ignore_ascii_case(PRIMARY_LABEL))
        .unwrap_or(0);
    members[primary].is_primary = true;

    Ok(members)
}

/// Build the clustered view for parsed members.
pub fn clustered_view(members: Vec<MemberStatus>) -> TopologyView {
    let oplog_timestamp = members
        .iter()
        .find(|m| m.is_primary)
        .and_then(|m| m.optime_secs);
    TopologyView::Clustered {
        members,
        oplog_timestamp,
    }
}

fn parse_member(idx: usize, entry: &Value) -> Result<MemberStatus, TopologyError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| TopologyError::Malformed(format!("member {idx} is not an object")))?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| TopologyError::Malformed(format!("member {idx} has no name")))?
        .to_string();

    let health = obj
        .get("health")
        .and_then(|v| normalize(&RawValue::from_json(v)).as_number())
        .map_or(0, |h| if h >= 1.0 { 1 } else { 0 });

    let state = obj
        .get("stateStr")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_LABEL)
        .to_string();

    let optime_secs = obj
        .get("optimeDate")
        .and_then(date_secs)
        .or_else(|| obj.get("optime").and_then(optime_secs));

    Ok(MemberStatus {
        name,
        health,
        state,
        is_primary: false,
        optime_secs,
    })
}

/// `{"$date": millis}`, `{"$date": {"$numberLong": ".."}}`,
/// `{"$date": "<rfc3339>"}`, or bare milliseconds.
fn date_secs(value: &Value) -> Option<f64> {
    let inner = match value {
        Value::Object(map) => map.get("$date")?,
        other => other,
    };
    if let Some(text) = inner.as_str() {
        return DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.timestamp_millis() as f64 / 1000.0);
    }
    normalize(&RawValue::from_json(inner))
        .as_number()
        .map(|millis| millis / 1000.0)
}

/// `{"ts": {"$timestamp": {"t": secs, "i": n}}}` or `{"$timestamp": {...}}`.
fn optime_secs(value: &Value) -> Option<f64> {
    let ts = value.get("ts").unwrap_or(value);
    let secs = ts.get("$timestamp")?.get("t")?;
    normalize(&RawValue::from_json(secs)).as_number()
}
