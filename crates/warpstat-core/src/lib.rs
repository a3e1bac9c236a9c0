//! warpstat-core — shared building blocks for the warpstat exporter.
//!
//! Holds the value model read from a stats provider, the numeric
//! normalizer that turns every recognized encoding into an `f64`, the
//! `StatsProvider` boundary trait, and `warpstat.toml` parsing.

pub mod config;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod topology;
pub mod types;

pub use config::{ExporterConfig, PollSettings};
pub use error::{ConfigError, ProviderError};
pub use normalize::normalize;
pub use provider::{ProviderFuture, StatsProvider};
pub use topology::{MemberStatus, TopologyView, STANDALONE_LABEL};
pub use types::*;
