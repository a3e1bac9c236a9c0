//! Metric family catalog and sample extraction.
//!
//! Each [`FamilySpec`] names an exported family and says where its
//! samples live in the stats document. A missing sub-document yields no
//! samples; nothing is zero-filled.

use serde_json::Value;

use warpstat_core::{MetricKey, MetricKind, MetricSample, RawValue, StatsDocument};

/// Where a family's samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A single unlabeled value.
    Leaf(&'static [&'static str]),
    /// Every scalar child of a sub-document, labeled by the child key.
    Children(&'static [&'static str]),
    /// Named children only, with their label values renamed.
    Selected(&'static [&'static str], &'static [(&'static str, &'static str)]),
    /// `path.<outer>.<inner_field>.<inner>`, labeled by outer then inner key.
    Nested(&'static [&'static str], &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySpec {
    /// Family name without the namespace prefix.
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
    pub source: Source,
}

/// Families exported from a `serverStatus`-shaped document.
pub const CATALOG: &[FamilySpec] = &[
    FamilySpec {
        name: "op_counters_total",
        help: "Operations executed since the server started, by type.",
        kind: MetricKind::Cumulative,
        labels: &["type"],
        source: Source::Children(&["opcounters"]),
    },
    FamilySpec {
        name: "op_counters_repl_total",
        help: "Replicated operations applied since the server started, by type.",
        kind: MetricKind::Cumulative,
        labels: &["type"],
        source: Source::Children(&["opcountersRepl"]),
    },
    FamilySpec {
        name: "locks_acquire_total",
        help: "Lock acquisitions, by lock type and mode.",
        kind: MetricKind::Cumulative,
        labels: &["lock_type", "mode"],
        source: Source::Nested(&["locks"], "acquireCount"),
    },
    FamilySpec {
        name: "network_bytes_total",
        help: "Network traffic, by direction.",
        kind: MetricKind::Cumulative,
        labels: &["direction"],
        source: Source::Selected(&["network"], &[("bytesIn", "in"), ("bytesOut", "out")]),
    },
    FamilySpec {
        name: "network_requests_total",
        help: "Distinct requests received.",
        kind: MetricKind::Cumulative,
        labels: &[],
        source: Source::Leaf(&["network", "numRequests"]),
    },
    FamilySpec {
        name: "asserts_total",
        help: "Asserts raised since the server started, by type.",
        kind: MetricKind::Cumulative,
        labels: &["type"],
        source: Source::Children(&["asserts"]),
    },
    FamilySpec {
        name: "connections_created_total",
        help: "Incoming connections created.",
        kind: MetricKind::Cumulative,
        labels: &[],
        source: Source::Leaf(&["connections", "totalCreated"]),
    },
    FamilySpec {
        name: "connections",
        help: "Incoming connections, by state.",
        kind: MetricKind::Instantaneous,
        labels: &["state"],
        source: Source::Selected(
            &["connections"],
            &[("current", "current"), ("available", "available")],
        ),
    },
    FamilySpec {
        name: "memory_megabytes",
        help: "Process memory in megabytes, by type.",
        kind: MetricKind::Instantaneous,
        labels: &["type"],
        source: Source::Selected(&["mem"], &[("resident", "resident"), ("virtual", "virtual")]),
    },
    FamilySpec {
        name: "global_lock_current_queue",
        help: "Operations queued waiting for the global lock, by type.",
        kind: MetricKind::Instantaneous,
        labels: &["type"],
        source: Source::Selected(
            &["globalLock", "currentQueue"],
            &[("readers", "reader"), ("writers", "writer")],
        ),
    },
    FamilySpec {
        name: "uptime_seconds",
        help: "Seconds since the server started.",
        kind: MetricKind::Instantaneous,
        labels: &[],
        source: Source::Leaf(&["uptime"]),
    },
];

impl FamilySpec {
    /// Read this family's samples out of a stats document.
    pub fn extract(&self, doc: &StatsDocument) -> Vec<MetricSample> {
        let sample = |labels: Vec<String>, value: &Value| MetricSample {
            key: MetricKey::new(self.name, labels),
            raw: RawValue::from_json(value),
            kind: self.kind,
        };

        match self.source {
            Source::Leaf(path) => doc
                .lookup(path)
                .filter(|v| !is_sub_document(v))
                .map(|v| vec![sample(Vec::new(), v)])
                .unwrap_or_default(),
            Source::Children(path) => match doc.lookup(path).and_then(Value::as_object) {
                Some(children) => children
                    .iter()
                    .filter(|(_, v)| !is_sub_document(v))
                    .map(|(name, v)| sample(vec![name.clone()], v))
                    .collect(),
                None => Vec::new(),
            },
            Source::Selected(path, fields) => match doc.lookup(path).and_then(Value::as_object) {
                Some(children) => fields
                    .iter()
                    .filter_map(|(field, label)| {
                        children
                            .get(*field)
                            .map(|v| sample(vec![(*label).to_string()], v))
                    })
                    .collect(),
                None => Vec::new(),
            },
            Source::Nested(path, inner_field) => {
                let Some(outer) = doc.lookup(path).and_then(Value::as_object) else {
                    return Vec::new();
                };
                let mut samples = Vec::new();
                for (outer_name, outer_value) in outer {
                    let Some(inner) = outer_value
                        .get(inner_field)
                        .and_then(Value::as_object)
                    else {
                        continue;
                    };
                    for (inner_name, v) in inner {
                        if is_sub_document(v) {
                            continue;
                        }
                        samples.push(sample(vec![outer_name.clone(), inner_name.clone()], v));
                    }
                }
                samples
            }
        }
    }
}

/// Extract every family in `catalog` from `doc`.
pub fn extract_all(catalog: &[FamilySpec], doc: &StatsDocument) -> Vec<MetricSample> {
    catalog.iter().flat_map(|spec| spec.extract(doc)).collect()
}

/// Nested documents and arrays are structure, not samples. Objects that
/// decode as numeric wrappers still count as values.
fn is_sub_document(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(_) => RawValue::from_json(value) == RawValue::Unrecognized,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> StatsDocument {
        StatsDocument::from_value(value).unwrap()
    }

    fn family(name: &str) -> FamilySpec {
        CATALOG.iter().find(|spec| spec.name == name).copied().unwrap()
    }

    fn labels(samples: &[MetricSample]) -> Vec<Vec<String>> {
        let mut out: Vec<_> = samples.iter().map(|s| s.key.labels.clone()).collect();
        out.sort();
        out
    }

    #[test]
    fn catalog_label_arity_matches_source() {
        for spec in CATALOG {
            let expected = match spec.source {
                Source::Leaf(_) => 0,
                Source::Children(_) | Source::Selected(..) => 1,
                Source::Nested(..) => 2,
            };
            assert_eq!(spec.labels.len(), expected, "family {}", spec.name);
        }
    }

    #[test]
    fn catalog_names_are_unique() {
        let mut names: Vec<_> = CATALOG.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn children_become_labels() {
        let d = doc(json!({
            "opcounters": {
                "insert": 10, "query": {"$numberLong": "20"}, "deprecated": {"total": 1}
            }
        }));
        let samples = family("op_counters_total").extract(&d);
        assert_eq!(labels(&samples), vec![vec!["insert"], vec!["query"]]);
        assert!(samples.iter().all(|s| s.kind == MetricKind::Cumulative));
    }

    #[test]
    fn selected_fields_are_renamed() {
        let d = doc(json!({
            "network": { "bytesIn": 100, "bytesOut": 200, "physicalBytesIn": 7 }
        }));
        let samples = family("network_bytes_total").extract(&d);
        assert_eq!(labels(&samples), vec![vec!["in"], vec!["out"]]);
    }

    #[test]
    fn nested_locks_carry_two_labels() {
        let d = doc(json!({
            "locks": {
                "Global": { "acquireCount": { "r": 5, "w": 2 } },
                "Database": { "acquireCount": { "W": 1 } },
                "Mutex": { "acquireWaitCount": { "r": 9 } }
            }
        }));
        let samples = family("locks_acquire_total").extract(&d);
        assert_eq!(
            labels(&samples),
            vec![
                vec!["Database".to_string(), "W".to_string()],
                vec!["Global".to_string(), "r".to_string()],
                vec!["Global".to_string(), "w".to_string()],
            ]
        );
    }

    #[test]
    fn leaf_values() {
        let d = doc(json!({ "uptime": 3600, "network": { "numRequests": 12 } }));
        let uptime = family("uptime_seconds").extract(&d);
        assert_eq!(uptime.len(), 1);
        assert_eq!(uptime[0].raw, RawValue::Int32(3600));
        assert_eq!(uptime[0].kind, MetricKind::Instantaneous);
        assert!(uptime[0].key.labels.is_empty());

        let requests = family("network_requests_total").extract(&d);
        assert_eq!(requests[0].key, MetricKey::unlabeled("network_requests_total"));
    }

    #[test]
    fn missing_sections_yield_nothing() {
        let d = doc(json!({ "host": "db1" }));
        assert!(extract_all(CATALOG, &d).is_empty());
    }

    #[test]
    fn unrecognized_scalars_are_still_sampled() {
        // The normalizer decides availability; extraction keeps the key.
        let d = doc(json!({ "asserts": { "regular": "n/a", "user": 4 } }));
        let samples = family("asserts_total").extract(&d);
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().any(|s| s.raw == RawValue::Unrecognized));
    }
}
