//! The stats provider boundary.
//!
//! The exporter never speaks a wire protocol itself. Anything that can
//! hand back a stats document and a topology status implements
//! [`StatsProvider`]; the poller drives it behind a timeout.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::error::ProviderError;
use crate::types::StatsDocument;

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Source of statistics for one monitored process.
pub trait StatsProvider: Send + Sync {
    /// Human-readable connection target, used in logs.
    fn target(&self) -> &str;

    /// Initial handshake. Called once before polling starts.
    fn connect(&self) -> ProviderFuture<'_, ()>;

    /// Fetch the current cumulative and instantaneous statistics.
    fn fetch_stats(&self) -> ProviderFuture<'_, StatsDocument>;

    /// Fetch cluster/replication status as an undecoded document.
    ///
    /// Deployments without clustering typically answer with
    /// [`ProviderError::Unsupported`].
    fn fetch_topology(&self) -> ProviderFuture<'_, Value>;
}
