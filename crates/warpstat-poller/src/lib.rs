//! warpstat-poller — drives collection cycles against a stats provider.
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ──connect() ok──▶ Polling ──▶ poll_once() every interval
//!     │
//!     └── connect() err → PollError::Connection (fatal to the caller)
//! ```
//!
//! Each cycle fetches the stats document, applies it through the
//! [`StatsCollector`](warpstat_metrics::StatsCollector), then collects
//! topology. A failed stats request marks the exporter down and leaves
//! every exported value as it was. Cycles never overlap.

pub mod error;
pub mod poller;

pub use error::PollError;
pub use poller::{Poller, PollerState};
