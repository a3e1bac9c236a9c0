//! warpstat-state — in-memory snapshot store for the exporter.
//!
//! Holds exactly one value per metric key: the reconciliation baseline
//! for cumulative keys and the last reading for instantaneous keys.
//! There is no history and nothing is persisted; a fresh process
//! rebuilds its state from the first poll.
//!
//! The poller is the only writer. Gauge readings are read back by the
//! export registry when it renders, so the store is the one place a
//! gauge's value lives.
//!
//! The `SnapshotStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<RwLock<..>>`). Each lock is held for a single get or set.

pub mod store;

pub use store::{GaugeState, SnapshotStore};
