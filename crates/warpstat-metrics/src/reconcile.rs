//! Delta-counter reconciliation.
//!
//! Converts successive cumulative readings into non-negative increments
//! for an exported monotonic counter:
//!
//! ```text
//! no baseline           → store value, increment 0
//! value >= previous     → increment value - previous, store value
//! value <  previous     → reset: store value, increment 0
//! value unavailable     → store untouched, increment 0
//! ```
//!
//! The first reading is only a baseline so that history accumulated
//! before this process started is not exported as one burst. A reset
//! drops the increments of the cycle in which it happened.

use tracing::info;

use warpstat_core::{MetricKey, NormalizedValue};
use warpstat_state::SnapshotStore;

/// What reconciling one reading did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    /// First valid reading for the key; stored as the baseline.
    Baseline { value: f64 },
    /// Reading at or above the baseline. `increment` may be zero.
    Advanced { increment: f64 },
    /// Reading below the baseline; re-baselined without an increment.
    Reset { previous: f64, current: f64 },
    /// Reading was unavailable; baseline left untouched.
    Skipped,
}

impl Reconciliation {
    /// Amount to add to the exported counter. Never negative.
    pub fn increment(&self) -> f64 {
        match self {
            Reconciliation::Advanced { increment } => *increment,
            _ => 0.0,
        }
    }
}

/// Applies the reconciliation rules against a [`SnapshotStore`].
///
/// Callers must not reconcile the same key from two tasks at once; the
/// poller serializes cycles to guarantee this.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: SnapshotStore,
}

impl Reconciler {
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    /// Reconcile one cumulative reading and update the stored baseline.
    pub fn reconcile(&self, key: &MetricKey, value: NormalizedValue) -> Reconciliation {
        let Some(current) = value.as_number() else {
            return Reconciliation::Skipped;
        };

        match self.store.get_previous(key) {
            None => {
                self.store.set_current(key, current);
                Reconciliation::Baseline { value: current }
            }
            Some(previous) if current >= previous => {
                self.store.set_current(key, current);
                Reconciliation::Advanced {
                    increment: current - previous,
                }
            }
            Some(previous) => {
                self.store.set_current(key, current);
                info!(%key, previous, current, "counter reset detected, re-baselined");
                Reconciliation::Reset { previous, current }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> MetricKey {
        MetricKey::new("op_counters_total", vec!["insert".to_string()])
    }

    fn n(v: f64) -> NormalizedValue {
        NormalizedValue::Number(v)
    }

    fn reconciler() -> (Reconciler, SnapshotStore) {
        let store = SnapshotStore::new();
        (Reconciler::new(store.clone()), store)
    }

    #[test]
    fn first_observation_is_baseline() {
        let (r, store) = reconciler();
        let outcome = r.reconcile(&key(), n(500.0));
        assert_eq!(outcome, Reconciliation::Baseline { value: 500.0 });
        assert_eq!(outcome.increment(), 0.0);
        assert_eq!(store.get_previous(&key()), Some(500.0));
    }

    #[test]
    fn normal_increment() {
        let (r, store) = reconciler();
        r.reconcile(&key(), n(100.0));
        let outcome = r.reconcile(&key(), n(130.0));
        assert_eq!(outcome.increment(), 30.0);
        assert_eq!(store.get_previous(&key()), Some(130.0));
    }

    #[test]
    fn tie_is_steady_state() {
        let r = Reconciler::new(SnapshotStore::new());
        r.reconcile(&key(), n(100.0));
        let outcome = r.reconcile(&key(), n(100.0));
        assert_eq!(outcome, Reconciliation::Advanced { increment: 0.0 });
    }

    #[test]
    fn reset_is_absorbed_and_rebaselined() {
        let (r, store) = reconciler();
        r.reconcile(&key(), n(100.0));

        let outcome = r.reconcile(&key(), n(5.0));
        assert_eq!(
            outcome,
            Reconciliation::Reset {
                previous: 100.0,
                current: 5.0
            }
        );
        assert_eq!(outcome.increment(), 0.0);
        assert_eq!(store.get_previous(&key()), Some(5.0));

        let outcome = r.reconcile(&key(), n(8.0));
        assert_eq!(outcome.increment(), 3.0);
    }

    #[test]
    fn unavailable_leaves_baseline_untouched() {
        let (r, store) = reconciler();
        r.reconcile(&key(), n(100.0));

        let outcome = r.reconcile(&key(), NormalizedValue::Unavailable);
        assert_eq!(outcome, Reconciliation::Skipped);
        assert_eq!(store.get_previous(&key()), Some(100.0));

        // Next delta is against the last valid baseline, not zero.
        assert_eq!(r.reconcile(&key(), n(110.0)).increment(), 10.0);
    }

    #[test]
    fn unavailable_first_reading_creates_nothing() {
        let (r, store) = reconciler();
        r.reconcile(&key(), NormalizedValue::Unavailable);
        assert_eq!(store.get_previous(&key()), None);
        assert!(store.gauges().is_empty());
    }

    #[test]
    fn exported_total_is_monotonic() {
        let r = Reconciler::new(SnapshotStore::new());
        let readings = [
            Some(10.0),
            Some(15.0),
            None,
            Some(12.0),
            Some(40.0),
            Some(0.0),
            None,
            Some(0.0),
            Some(3.5),
            Some(1e12),
            Some(1e12),
        ];

        let mut total = 0.0;
        let mut totals = Vec::new();
        for reading in readings {
            let value = reading.map_or(NormalizedValue::Unavailable, NormalizedValue::Number);
            let inc = r.reconcile(&key(), value).increment();
            assert!(inc >= 0.0);
            total += inc;
            totals.push(total);
        }

        assert!(totals.windows(2).all(|w| w[1] >= w[0]), "{totals:?}");
        // 10→15 (+5), reset to 12, 12→40 (+28), reset to 0, 0→0, 0→3.5, 3.5→1e12
        assert_eq!(total, 5.0 + 28.0 + 3.5 + (1e12 - 3.5));
    }
}
