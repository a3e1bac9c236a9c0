//! Poller — the collection loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use warpstat_core::{PollSettings, ProviderError, StatsProvider};
use warpstat_metrics::{CATALOG, CycleOutcome, CycleReport, ExportRegistry, StatsCollector};
use warpstat_topology::TopologyCollector;

use crate::error::PollError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Waiting for the startup handshake.
    Connecting,
    /// Handshake done; cycles may run.
    Polling,
}

/// Owns the poll lifecycle for one provider.
pub struct Poller {
    provider: Arc<dyn StatsProvider>,
    collector: StatsCollector,
    topology: TopologyCollector,
    settings: PollSettings,
    connected: AtomicBool,
    /// Held for the whole of a cycle so cycles never overlap.
    cycle: Mutex<()>,
}

impl Poller {
    /// Create a poller in the `Connecting` state.
    pub fn new(
        provider: Arc<dyn StatsProvider>,
        exports: Arc<ExportRegistry>,
        settings: PollSettings,
    ) -> Self {
        Self {
            provider,
            collector: StatsCollector::new(CATALOG, exports),
            topology: TopologyCollector::new(settings.timeout),
            settings,
            connected: AtomicBool::new(false),
            cycle: Mutex::new(()),
        }
    }

    pub fn state(&self) -> PollerState {
        if self.connected.load(Ordering::Acquire) {
            PollerState::Polling
        } else {
            PollerState::Connecting
        }
    }

    pub fn exports(&self) -> &Arc<ExportRegistry> {
        self.collector.exports()
    }

    /// Perform the startup handshake and move to `Polling`.
    pub async fn connect(&self) -> Result<(), PollError> {
        let target = self.provider.target().to_string();
        debug!(%target, "connecting to stats provider");

        match self.bounded(self.provider.connect()).await {
            Ok(()) => {
                self.connected.store(true, Ordering::Release);
                info!(%target, "connected to stats provider");
                Ok(())
            }
            Err(source) => Err(PollError::Connection { target, source }),
        }
    }

    /// Run exactly one collection cycle.
    ///
    /// Waits for any cycle already in progress to finish first.
    pub async fn poll_once(&self) -> Result<CycleReport, PollError> {
        if self.state() != PollerState::Polling {
            return Err(PollError::NotConnected);
        }

        let _cycle = self.cycle.lock().await;
        let started = Instant::now();
        let exports = self.collector.exports();

        let doc = match self.bounded(self.provider.fetch_stats()).await {
            Ok(doc) => doc,
            Err(e) => {
                exports.set_up(false);
                exports.record_cycle(CycleOutcome::Failure, started.elapsed());
                warn!(target_addr = %self.provider.target(), error = %e, "stats request failed, keeping last values");
                return Err(PollError::Cycle(e));
            }
        };

        exports.set_up(true);
        let report = self.collector.apply(&doc);

        let view = self.topology.collect(self.provider.as_ref()).await;
        exports.publish_topology(&view);

        let elapsed = started.elapsed();
        exports.record_cycle(CycleOutcome::Success, elapsed);
        debug!(elapsed_ms = elapsed.as_millis() as u64, "poll cycle complete");
        Ok(report)
    }

    /// Poll immediately, then every `interval`, until `shutdown` fires.
    ///
    /// A cycle that overruns the interval delays the next one; cycles are
    /// never started in parallel.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.settings.interval.as_millis() as u64,
            timeout_ms = self.settings.timeout.as_millis() as u64,
            "poller started"
        );

        loop {
            // Errors are logged and recorded inside poll_once.
            let _ = self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = shutdown.changed() => {
                    info!("poller shutting down");
                    break;
                }
            }
        }
    }

    /// Bound a provider call by the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let timeout = self.settings.timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(duration_ms(timeout))),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
