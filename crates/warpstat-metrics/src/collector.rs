//! Stats collector — applies one stats document to exported state.
//!
//! Cumulative samples go through the reconciler and their increments
//! are added to the exported counters. Instantaneous samples overwrite
//! their gauge reading in the snapshot store. Samples that fail to normalize are skipped for this
//! cycle without touching any stored value.

use std::sync::Arc;

use tracing::debug;

use warpstat_core::{MetricKind, StatsDocument, normalize};

use crate::exporter::ExportRegistry;
use crate::families::{FamilySpec, extract_all};
use crate::reconcile::{Reconciler, Reconciliation};

/// Tally of what one cycle changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub baselines: usize,
    pub counters_advanced: usize,
    pub resets: usize,
    pub gauges_updated: usize,
    pub unavailable: usize,
}

/// Feeds stats documents through normalization and reconciliation.
pub struct StatsCollector {
    catalog: &'static [FamilySpec],
    reconciler: Reconciler,
    exports: Arc<ExportRegistry>,
}

impl StatsCollector {
    /// Baselines and gauge readings live in the registry's store.
    pub fn new(catalog: &'static [FamilySpec], exports: Arc<ExportRegistry>) -> Self {
        Self {
            catalog,
            reconciler: Reconciler::new(exports.store().clone()),
            exports,
        }
    }

    pub fn exports(&self) -> &Arc<ExportRegistry> {
        &self.exports
    }

    /// Apply every family in the catalog from `doc`.
    pub fn apply(&self, doc: &StatsDocument) -> CycleReport {
        let mut report = CycleReport::default();

        for sample in extract_all(self.catalog, doc) {
            let value = normalize(&sample.raw);
            if !value.is_available() {
                debug!(key = %sample.key, raw = ?sample.raw, "sample could not be normalized, skipped");
                self.exports.record_unavailable(&sample.key.family);
                report.unavailable += 1;
                continue;
            }

            match sample.kind {
                MetricKind::Cumulative => {
                    let outcome = self.reconciler.reconcile(&sample.key, value);
                    match outcome {
                        Reconciliation::Baseline { .. } => report.baselines += 1,
                        Reconciliation::Advanced { .. } => report.counters_advanced += 1,
                        Reconciliation::Reset { .. } => {
                            self.exports.record_reset(&sample.key.family);
                            report.resets += 1;
                        }
                        Reconciliation::Skipped => {}
                    }
                    self.exports.add_to_counter(&sample.key, outcome.increment());
                }
                MetricKind::Instantaneous => {
                    if let Some(v) = value.as_number() {
                        self.exports.store().set_gauge(&sample.key, v);
                        report.gauges_updated += 1;
                    }
                }
            }
        }

        debug!(
            baselines = report.baselines,
            advanced = report.counters_advanced,
            resets = report.resets,
            gauges = report.gauges_updated,
            unavailable = report.unavailable,
            "stats document applied"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::CATALOG;
    use serde_json::{Value, json};
    use warpstat_core::MetricKey;
    use warpstat_state::SnapshotStore;

    fn collector() -> StatsCollector {
        let exports = Arc::new(ExportRegistry::new("mongodb", CATALOG, SnapshotStore::new()).unwrap());
        StatsCollector::new(CATALOG, exports)
    }

    fn doc(value: Value) -> StatsDocument {
        StatsDocument::from_value(value).unwrap()
    }

    fn ops(insert: Value) -> StatsDocument {
        doc(json!({ "opcounters": { "insert": insert } }))
    }

    fn insert_key() -> MetricKey {
        MetricKey::new("op_counters_total", vec!["insert".to_string()])
    }

    #[test]
    fn first_document_only_sets_baselines() {
        let c = collector();
        let report = c.apply(&doc(json!({
            "opcounters": { "insert": 100, "query": 40 },
            "connections": { "current": 7, "available": 93, "totalCreated": 12 },
            "uptime": 60
        })));

        assert_eq!(report.baselines, 3);
        assert_eq!(report.gauges_updated, 3);
        assert_eq!(c.exports().counter_total(&insert_key()), Some(0.0));
        assert_eq!(c.exports().store().get_previous(&insert_key()), Some(100.0));
        assert_eq!(
            c.exports()
                .store()
                .gauge(&MetricKey::new("connections", vec!["current".to_string()])),
            Some(7.0)
        );
    }

    #[test]
    fn increments_accumulate_across_cycles() {
        let c = collector();
        c.apply(&ops(json!(100)));
        c.apply(&ops(json!(130)));
        c.apply(&ops(json!({"$numberLong": "145"})));
        assert_eq!(c.exports().counter_total(&insert_key()), Some(45.0));
    }

    #[test]
    fn reset_keeps_exported_total() {
        let c = collector();
        c.apply(&ops(json!(100)));
        c.apply(&ops(json!(130)));
        let report = c.apply(&ops(json!(5)));
        assert_eq!(report.resets, 1);
        assert_eq!(c.exports().counter_total(&insert_key()), Some(30.0));
        assert_eq!(c.exports().resets("op_counters_total"), 1);

        c.apply(&ops(json!(8)));
        assert_eq!(c.exports().counter_total(&insert_key()), Some(33.0));
    }

    #[test]
    fn unavailable_sample_is_inert() {
        let c = collector();
        c.apply(&ops(json!(100)));
        let report = c.apply(&ops(json!({"$numberDecimal": "NaN"})));
        assert_eq!(report.unavailable, 1);
        assert_eq!(c.exports().store().get_previous(&insert_key()), Some(100.0));

        c.apply(&ops(json!(120)));
        assert_eq!(c.exports().counter_total(&insert_key()), Some(20.0));
    }

    #[test]
    fn unavailable_gauge_keeps_stale_value() {
        let c = collector();
        let key = MetricKey::unlabeled("uptime_seconds");
        c.apply(&doc(json!({ "uptime": 60 })));
        c.apply(&doc(json!({ "uptime": "unknown" })));
        assert_eq!(c.exports().store().gauge(&key), Some(60.0));
        assert!(c.exports().render().unwrap().contains("mongodb_uptime_seconds 60"));
    }

    #[test]
    fn unavailable_key_does_not_affect_siblings() {
        let c = collector();
        c.apply(&doc(json!({ "opcounters": { "insert": 1, "query": 1 } })));
        c.apply(&doc(json!({ "opcounters": { "insert": true, "query": 4 } })));

        let query = MetricKey::new("op_counters_total", vec!["query".to_string()]);
        assert_eq!(c.exports().counter_total(&query), Some(3.0));
        assert_eq!(c.exports().counter_total(&insert_key()), Some(0.0));
    }

    #[test]
    fn mixed_numeric_encodings() {
        let c = collector();
        c.apply(&doc(json!({
            "network": { "bytesIn": {"low": 0, "high": 1}, "bytesOut": 10.5 }
        })));
        c.apply(&doc(json!({
            "network": {
                "bytesIn": {"$numberLong": "4294967396"},
                "bytesOut": {"$numberDecimal": "20.5"}
            }
        })));

        let bytes_in = MetricKey::new("network_bytes_total", vec!["in".to_string()]);
        let bytes_out = MetricKey::new("network_bytes_total", vec!["out".to_string()]);
        assert_eq!(c.exports().counter_total(&bytes_in), Some(100.0));
        assert_eq!(c.exports().counter_total(&bytes_out), Some(10.0));
    }
}
