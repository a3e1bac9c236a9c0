//! SnapshotStore — last-value bookkeeping for counter and gauge keys.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use warpstat_core::MetricKey;

/// Reconciliation baseline for one cumulative key.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CounterState {
    /// Last normalized value that was successfully reconciled.
    last_observed: f64,
}

/// Last reading for one instantaneous key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeState {
    pub value: f64,
}

#[derive(Debug, Default)]
struct Snapshots {
    counters: HashMap<MetricKey, CounterState>,
    gauges: HashMap<MetricKey, GaugeState>,
}

/// Thread-safe map from metric key to its most recent value.
///
/// Entries are created on first observation and never removed.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Snapshots>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Counters ───────────────────────────────────────────────────

    /// Baseline for a cumulative key, if it has been observed.
    pub fn get_previous(&self, key: &MetricKey) -> Option<f64> {
        let snapshots = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        snapshots.counters.get(key).map(|c| c.last_observed)
    }

    /// Record the new baseline for a cumulative key.
    pub fn set_current(&self, key: &MetricKey, value: f64) {
        let mut snapshots = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match snapshots.counters.get_mut(key) {
            Some(state) => state.last_observed = value,
            None => {
                snapshots
                    .counters
                    .insert(key.clone(), CounterState { last_observed: value });
                debug!(%key, value, "counter baseline created");
            }
        }
    }

    // ── Gauges ─────────────────────────────────────────────────────

    /// Last reading for an instantaneous key.
    pub fn gauge(&self, key: &MetricKey) -> Option<f64> {
        let snapshots = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        snapshots.gauges.get(key).map(|g| g.value)
    }

    /// Overwrite the reading for an instantaneous key.
    pub fn set_gauge(&self, key: &MetricKey, value: f64) {
        let mut snapshots = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        snapshots
            .gauges
            .insert(key.clone(), GaugeState { value });
    }

    /// All gauge readings, sorted by key. This is what the exporter
    /// publishes.
    pub fn gauges(&self) -> Vec<(MetricKey, GaugeState)> {
        let snapshots = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = snapshots
            .gauges
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(family: &str, label: &str) -> MetricKey {
        MetricKey::new(family, vec![label.to_string()])
    }

    #[test]
    fn unknown_key_has_no_previous() {
        let store = SnapshotStore::new();
        assert_eq!(store.get_previous(&key("ops", "insert")), None);
        assert_eq!(store.gauge(&key("conns", "current")), None);
    }

    #[test]
    fn set_then_get_previous() {
        let store = SnapshotStore::new();
        let k = key("ops", "insert");
        store.set_current(&k, 10.0);
        assert_eq!(store.get_previous(&k), Some(10.0));

        store.set_current(&k, 12.0);
        assert_eq!(store.get_previous(&k), Some(12.0));
    }

    #[test]
    fn keys_are_independent() {
        let store = SnapshotStore::new();
        store.set_current(&key("ops", "insert"), 1.0);
        store.set_current(&key("ops", "query"), 2.0);
        store.set_current(&key("bytes", "insert"), 3.0);

        assert_eq!(store.get_previous(&key("ops", "insert")), Some(1.0));
        assert_eq!(store.get_previous(&key("ops", "query")), Some(2.0));
        assert_eq!(store.get_previous(&key("bytes", "insert")), Some(3.0));
    }

    #[test]
    fn counters_and_gauges_do_not_share_entries() {
        let store = SnapshotStore::new();
        let k = MetricKey::unlabeled("uptime");
        store.set_gauge(&k, 5.0);
        assert_eq!(store.get_previous(&k), None);
        assert_eq!(store.gauge(&k), Some(5.0));
        assert_eq!(store.gauges().len(), 1);
    }

    #[test]
    fn gauge_listing_is_sorted_and_excludes_counters() {
        let store = SnapshotStore::new();
        store.set_current(&key("ops", "update"), 1.0);
        store.set_gauge(&key("mem", "virtual"), 1.0);
        store.set_gauge(&key("mem", "resident"), 1.0);

        let gauges: Vec<_> = store.gauges().into_iter().map(|(k, _)| k).collect();
        assert_eq!(gauges, vec![key("mem", "resident"), key("mem", "virtual")]);
    }

    #[tokio::test]
    async fn concurrent_readers_see_whole_values() {
        let store = SnapshotStore::new();
        let k = key("ops", "insert");
        store.set_current(&k, 0.0);

        let writer = {
            let store = store.clone();
            let k = k.clone();
            tokio::spawn(async move {
                for i in 1..=1000 {
                    store.set_current(&k, i as f64);
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut last = 0.0;
        for _ in 0..1000 {
            let seen = store.get_previous(&k).unwrap();
            assert!(seen >= last, "baseline went backwards: {seen} < {last}");
            last = seen;
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
        assert_eq!(store.get_previous(&k), Some(1000.0));
    }
}
