//! warpstat-provider — concrete [`StatsProvider`](warpstat_core::StatsProvider)
//! implementations.
//!
//! [`HttpStatsProvider`] reads the stats and topology documents as JSON
//! over plain HTTP/1.1, one connection per request.

pub mod client;

pub use client::HttpStatsProvider;
