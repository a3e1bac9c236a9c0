//! warpstat-topology — cluster status for the exporter.
//!
//! Queries the provider's optional topology source and turns the member
//! list into a [`TopologyView`](warpstat_core::TopologyView). The
//! collector is total: unsupported queries, timeouts, and malformed
//! responses all resolve to the `Standalone` view.
//!
//! # Primary selection
//!
//! The first member whose state label is `PRIMARY` is the primary. If no
//! member claims it, the first member listed stands in. The oplog
//! timestamp is that member's optime and is omitted when it has none.

pub mod collector;
pub mod members;

pub use collector::TopologyCollector;
pub use members::{TopologyError, clustered_view, parse_members};
