//! Poller errors.

use thiserror::Error;

use warpstat_core::ProviderError;

#[derive(Debug, Error)]
pub enum PollError {
    /// The startup handshake failed. Not retried.
    #[error("failed to connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: ProviderError,
    },

    /// The stats request of a cycle failed. Retried next cycle.
    #[error("stats request failed: {0}")]
    Cycle(#[source] ProviderError),

    #[error("poller has not connected yet")]
    NotConnected,
}
