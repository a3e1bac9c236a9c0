//! warpstat-metrics — turns stats documents into exported series.
//!
//! # Architecture
//!
//! ```text
//! StatsCollector::apply(doc)
//!   ├── families::extract_all() → MetricSample per catalog entry
//!   ├── normalize()             → NormalizedValue
//!   ├── Reconciler::reconcile() → non-negative increment (cumulative keys)
//!   ├── SnapshotStore           → baselines + gauge readings
//!   └── ExportRegistry          → running counter totals, `up`, gauges copied from the store on render
//!
//! Prometheus exposition
//!   └── ExportRegistry::render() → text/plain for /metrics
//! ```
//!
//! The `ExportRegistry` owns its own `prometheus::Registry`. It is built
//! once at startup and shared by the poller (writer) and the HTTP
//! endpoint (reader).

pub mod collector;
pub mod error;
pub mod exporter;
pub mod families;
pub mod reconcile;

pub use collector::{CycleReport, StatsCollector};
pub use error::ExportError;
pub use exporter::{CycleOutcome, ExportRegistry};
pub use families::{CATALOG, FamilySpec, Source};
pub use reconcile::{Reconciler, Reconciliation};
