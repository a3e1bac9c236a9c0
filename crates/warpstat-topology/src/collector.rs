//! Topology collector — never fails, falls back to standalone.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use warpstat_core::{ProviderError, StatsProvider, TopologyView};

use crate::members::{TopologyError, clustered_view, parse_members};

const KIND_UNKNOWN: u8 = 0;
const KIND_CLUSTERED: u8 = 1;
const KIND_STANDALONE: u8 = 2;

/// Resolves the topology view for each poll cycle.
#[derive(Debug)]
pub struct TopologyCollector {
    timeout: Duration,
    /// Kind of the last view returned, for change logging only.
    last_kind: AtomicU8,
}

impl TopologyCollector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_kind: AtomicU8::new(KIND_UNKNOWN),
        }
    }

    /// Query the provider's topology source. Any failure yields
    /// [`TopologyView::Standalone`].
    pub async fn collect(&self, provider: &dyn StatsProvider) -> TopologyView {
        let view = match self.try_collect(provider).await {
            Ok(view) => view,
            Err(TopologyError::Provider(ProviderError::Unsupported)) => {
                debug!(target_addr = %provider.target(), "topology query unsupported, reporting standalone");
                TopologyView::Standalone
            }
            Err(e) => {
                debug!(target_addr = %provider.target(), error = %e, "topology unavailable, reporting standalone");
                TopologyView::Standalone
            }
        };

        let kind = if view.is_standalone() {
            KIND_STANDALONE
        } else {
            KIND_CLUSTERED
        };
        let previous = self.last_kind.swap(kind, Ordering::Relaxed);
        if previous != kind {
            info!(
                target_addr = %provider.target(),
                standalone = view.is_standalone(),
                members = view.members().len(),
                "topology view changed"
            );
        }

        view
    }

    async fn try_collect(&self, provider: &dyn StatsProvider) -> Result<TopologyView, TopologyError> {
        let doc = tokio::time::timeout(self.timeout, provider.fetch_topology())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_millis() as u64))??;
        let members = parse_members(&doc)?;
        Ok(clustered_view(members))
    }
}
