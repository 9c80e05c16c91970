// Polling scheduler. Each session is one tokio task driving a ticker; a cycle runs
// to completion inside the task, so cycles of the same session never overlap and a
// slow cycle makes the next tick skip instead of queueing. Shutdown is only observed
// between cycles, so an in-flight cycle always finishes its registry writes.

mod host_refresh;
mod traffic_sampler;

pub use host_refresh::{HostRefresh, HostRefreshDeps};
pub use traffic_sampler::{TrafficSampler, TrafficSamplerDeps};

use std::future::Future;

use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, interval};
use tracing::Instrument;

use crate::models::{CycleEvent, SessionKind};

/// One periodic polling job.
pub trait Session: Send + Sync + 'static {
    fn kind(&self) -> SessionKind;

    /// One full sweep. Per-target failures are contained inside the cycle.
    fn run_cycle(&self) -> impl Future<Output = CycleEvent> + Send;
}

/// Session timing and signalling.
pub struct SessionConfig {
    pub interval: Duration,
    /// Receives a `CycleEvent` after every completed cycle (no receivers is fine).
    pub events: broadcast::Sender<CycleEvent>,
    /// Flips to `true` to stop the session after the current cycle.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Spawns `session` on its own task. The first cycle starts immediately.
pub fn spawn<S: Session>(session: S, config: SessionConfig) -> tokio::task::JoinHandle<()> {
    let SessionConfig {
        interval: period,
        events,
        mut shutdown_rx,
    } = config;

    let kind = session.kind();
    let session_span = tracing::span!(
        tracing::Level::DEBUG,
        "session",
        session = %kind,
        interval_secs = period.as_secs()
    );

    let task = async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(session = %kind, interval_secs = period.as_secs(), "polling session started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    let event = session.run_cycle().await;
                    tracing::info!(
                        session = %kind,
                        targets_polled = event.targets_polled,
                        targets_updated = event.targets_updated,
                        samples_appended = event.samples_appended,
                        "cycle complete"
                    );
                    if events.send(event).is_err() {
                        tracing::trace!(session = %kind, "no cycle event subscribers");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(session = %kind, "polling session shutting down");
    };
    tokio::spawn(task.instrument(session_span))
}
