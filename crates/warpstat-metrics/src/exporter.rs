//! Export registry — the state served to scrapers.
//!
//! Wraps an owned `prometheus::Registry` holding one counter or gauge
//! vector per catalog family, the availability flag, topology gauges,
//! and the exporter's own poll metrics. Counter totals live in the
//! registry. Gauge readings live in the [`SnapshotStore`] and are copied
//! into their vectors on every render.

use std::collections::HashMap;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::proto::Metric;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::warn;

use warpstat_core::{MetricKey, MetricKind, TopologyView};
use warpstat_state::SnapshotStore;

use crate::error::ExportError;
use crate::families::FamilySpec;

/// Result of one poll cycle, for the cycle counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    Failure,
}

impl CycleOutcome {
    fn label(self) -> &'static str {
        match self {
            CycleOutcome::Success => "success",
            CycleOutcome::Failure => "failure",
        }
    }
}

/// A catalog family's vector with its label names.
struct Family<V> {
    vec: V,
    labels: &'static [&'static str],
}

/// Explicit metrics registry, constructed once and shared by reference.
pub struct ExportRegistry {
    registry: Registry,
    store: SnapshotStore,
    counters: HashMap<&'static str, Family<CounterVec>>,
    gauges: HashMap<&'static str, Family<GaugeVec>>,
    up: Gauge,
    member_health: GaugeVec,
    member_primary: GaugeVec,
    replication_lag: GaugeVec,
    oplog_timestamp: GaugeVec,
    standalone: Gauge,
    poll_cycles: IntCounterVec,
    poll_duration: Gauge,
    counter_resets: IntCounterVec,
    unavailable_samples: IntCounterVec,
}

impl ExportRegistry {
    /// Build and register every metric for `catalog` under `namespace`.
    /// Gauge families are published from `store`.
    pub fn new(
        namespace: &str,
        catalog: &[FamilySpec],
        store: SnapshotStore,
    ) -> Result<Self, ExportError> {
        let registry = Registry::new();
        let name = |suffix: &str| format!("{namespace}_{suffix}");

        let mut counters = HashMap::new();
        let mut gauges = HashMap::new();
        for spec in catalog {
            let opts = Opts::new(name(spec.name), spec.help);
            match spec.kind {
                MetricKind::Cumulative => {
                    let vec = CounterVec::new(opts, spec.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    counters.insert(
                        spec.name,
                        Family {
                            vec,
                            labels: spec.labels,
                        },
                    );
                }
                MetricKind::Instantaneous => {
                    let vec = GaugeVec::new(opts, spec.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    gauges.insert(
                        spec.name,
                        Family {
                            vec,
                            labels: spec.labels,
                        },
                    );
                }
            }
        }

        let up = Gauge::new(name("up"), "Whether the last stats request succeeded.")?;
        registry.register(Box::new(up.clone()))?;

        let member_health = GaugeVec::new(
            Opts::new(name("replset_member_health"), "Member health (1 healthy, 0 not)."),
            &["member", "state"],
        )?;
        registry.register(Box::new(member_health.clone()))?;

        let member_primary = GaugeVec::new(
            Opts::new(name("replset_member_primary"), "1 for the member treated as primary."),
            &["member"],
        )?;
        registry.register(Box::new(member_primary.clone()))?;

        let replication_lag = GaugeVec::new(
            Opts::new(
                name("replset_member_replication_lag_seconds"),
                "Seconds a member's optime trails the primary's.",
            ),
            &["member"],
        )?;
        registry.register(Box::new(replication_lag.clone()))?;

        let oplog_timestamp = GaugeVec::new(
            Opts::new(
                name("replset_oplog_timestamp_seconds"),
                "Optime of the primary member, seconds since the epoch.",
            ),
            &[],
        )?;
        registry.register(Box::new(oplog_timestamp.clone()))?;

        let standalone = Gauge::new(
            name("topology_standalone"),
            "1 when no cluster status was available and a standalone view is reported.",
        )?;
        registry.register(Box::new(standalone.clone()))?;

        let poll_cycles = IntCounterVec::new(
            Opts::new("warpstat_poll_cycles_total", "Poll cycles completed, by outcome."),
            &["outcome"],
        )?;
        registry.register(Box::new(poll_cycles.clone()))?;

        let poll_duration = Gauge::new(
            "warpstat_poll_duration_seconds",
            "Duration of the most recent poll cycle.",
        )?;
        registry.register(Box::new(poll_duration.clone()))?;

        let counter_resets = IntCounterVec::new(
            Opts::new(
                "warpstat_counter_resets_total",
                "Provider counter resets absorbed by re-baselining, by family.",
            ),
            &["family"],
        )?;
        registry.register(Box::new(counter_resets.clone()))?;

        let unavailable_samples = IntCounterVec::new(
            Opts::new(
                "warpstat_unavailable_samples_total",
                "Samples dropped because their value could not be normalized, by family.",
            ),
            &["family"],
        )?;
        registry.register(Box::new(unavailable_samples.clone()))?;

        Ok(Self {
            registry,
            store,
            counters,
            gauges,
            up,
            member_health,
            member_primary,
            replication_lag,
            oplog_timestamp,
            standalone,
            poll_cycles,
            poll_duration,
            counter_resets,
            unavailable_samples,
        })
    }

    /// The store gauge readings are published from.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    // ── Families ───────────────────────────────────────────────────

    /// Add `increment` to the running total for a cumulative key.
    ///
    /// The series is created on first use, so a baseline cycle exposes a
    /// zero total.
    pub fn add_to_counter(&self, key: &MetricKey, increment: f64) {
        let Some(family) = self.counters.get(key.family.as_str()) else {
            warn!(%key, "no exported counter for family");
            return;
        };
        match family.vec.get_metric_with_label_values(&key.label_values()) {
            Ok(counter) if increment > 0.0 => counter.inc_by(increment),
            Ok(_) => {}
            Err(e) => warn!(%key, error = %e, "counter label mismatch"),
        }
    }

    /// Current exported total for a cumulative key. Does not create the
    /// series.
    pub fn counter_total(&self, key: &MetricKey) -> Option<f64> {
        let family = self.counters.get(key.family.as_str())?;
        read_series(&family.vec, family.labels, &key.label_values())
            .map(|m| m.get_counter().get_value())
    }

    /// Copy every stored gauge reading into its vector.
    fn publish_gauges(&self) {
        for (key, state) in self.store.gauges() {
            let Some(family) = self.gauges.get(key.family.as_str()) else {
                warn!(%key, "no exported gauge for family");
                continue;
            };
            match family.vec.get_metric_with_label_values(&key.label_values()) {
                Ok(gauge) => gauge.set(state.value),
                Err(e) => warn!(%key, error = %e, "gauge label mismatch"),
            }
        }
    }

    // ── Availability ───────────────────────────────────────────────

    pub fn set_up(&self, up: bool) {
        self.up.set(if up { 1.0 } else { 0.0 });
    }

    /// Healthy iff the last stats request succeeded.
    pub fn is_up(&self) -> bool {
        self.up.get() >= 1.0
    }

    // ── Topology ───────────────────────────────────────────────────

    /// Replace all topology series with those derived from `view`.
    ///
    /// The vectors are cleared and refilled series by series. A scrape
    /// landing in between sees a partial view for that one scrape.
    pub fn publish_topology(&self, view: &TopologyView) {
        self.member_health.reset();
        self.member_primary.reset();
        self.replication_lag.reset();
        self.oplog_timestamp.reset();

        for member in view.members() {
            self.member_health
                .with_label_values(&[member.name.as_str(), member.state.as_str()])
                .set(f64::from(member.health));
            self.member_primary
                .with_label_values(&[member.name.as_str()])
                .set(if member.is_primary { 1.0 } else { 0.0 });
        }

        if let Some(ts) = view.oplog_timestamp() {
            self.oplog_timestamp.with_label_values(&[]).set(ts);
        }
        for (member, lag) in view.replication_lag() {
            self.replication_lag
                .with_label_values(&[member.as_str()])
                .set(lag);
        }

        self.standalone
            .set(if view.is_standalone() { 1.0 } else { 0.0 });
    }

    // ── Exporter self-metrics ──────────────────────────────────────

    pub fn record_cycle(&self, outcome: CycleOutcome, elapsed: Duration) {
        self.poll_cycles
            .with_label_values(&[outcome.label()])
            .inc();
        self.poll_duration.set(elapsed.as_secs_f64());
    }

    /// Cycles recorded with `outcome`, without creating the series.
    pub fn cycles(&self, outcome: CycleOutcome) -> u64 {
        read_series(&self.poll_cycles, &["outcome"], &[outcome.label()])
            .map_or(0, |m| m.get_counter().get_value() as u64)
    }

    pub fn record_reset(&self, family: &str) {
        self.counter_resets.with_label_values(&[family]).inc();
    }

    pub fn resets(&self, family: &str) -> u64 {
        read_series(&self.counter_resets, &["family"], &[family])
            .map_or(0, |m| m.get_counter().get_value() as u64)
    }

    pub fn record_unavailable(&self, family: &str) {
        self.unavailable_samples.with_label_values(&[family]).inc();
    }

    // ── Exposition ─────────────────────────────────────────────────

    /// Render every registered metric in the Prometheus text format.
    pub fn render(&self) -> Result<String, ExportError> {
        self.publish_gauges();
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| ExportError::Encode(e.to_string()))
    }

    /// Content type for [`Self::render`] output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

/// Find the series of `collector` carrying exactly `values` for `names`,
/// if it has been created.
fn read_series(collector: &impl Collector, names: &[&str], values: &[&str]) -> Option<Metric> {
    if names.len() != values.len() {
        return None;
    }
    let families = collector.collect();
    families
        .iter()
        .flat_map(|mf| mf.get_metric())
        .find(|metric| {
            let labels = metric.get_label();
            labels.len() == names.len()
                && names.iter().zip(values).all(|(name, value)| {
                    labels
                        .iter()
                        .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
                })
        })
        .cloned()
}
