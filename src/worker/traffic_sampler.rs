// Traffic sampling session: discover interfaces, GET ifInOctets/ifOutOctets per
// interface and append to the in-memory series. A sample is stored only when both
// counters were read in the same round.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::debug;

use super::Session;
use crate::discovery::InterfaceDiscovery;
use crate::models::{CounterSample, CycleEvent, InterfaceIndex, SessionKind, Target, now_ms};
use crate::snmp::{SnmpClient, oid};
use crate::traffic::TrafficSeries;

pub struct TrafficSamplerDeps<C> {
    pub client: Arc<C>,
    pub discovery: InterfaceDiscovery<C>,
    pub series: Arc<TrafficSeries>,
}

pub struct TrafficSampler<C> {
    client: Arc<C>,
    discovery: InterfaceDiscovery<C>,
    series: Arc<TrafficSeries>,
    targets: Vec<Target>,
    prune_stale: bool,
    max_concurrency: usize,
}

impl<C: SnmpClient> TrafficSampler<C> {
    pub fn new(
        deps: TrafficSamplerDeps<C>,
        targets: Vec<Target>,
        prune_stale: bool,
        max_concurrency: usize,
    ) -> Self {
        Self {
            client: deps.client,
            discovery: deps.discovery,
            series: deps.series,
            targets,
            prune_stale,
            max_concurrency: max_concurrency.max(1),
        }
    }
}

/// Read one (rx, tx) pair. `None` if either counter is missing or non-numeric.
pub async fn read_counters<C: SnmpClient>(
    client: &C,
    target: &Target,
    index: InterfaceIndex,
) -> Option<(u64, u64)> {
    let rx_oid = oid::instance(oid::IF_IN_OCTETS, index);
    let tx_oid = oid::instance(oid::IF_OUT_OCTETS, index);
    let (rx, tx) = tokio::join!(
        client.scalar_get(target, &rx_oid),
        client.scalar_get(target, &tx_oid)
    );
    match (rx, tx) {
        (Ok(rx), Ok(tx)) => match (rx.as_u64(), tx.as_u64()) {
            (Some(rx), Some(tx)) => Some((rx, tx)),
            _ => {
                debug!(host = %target, interface = index, rx = %rx, tx = %tx, "non-numeric counter");
                None
            }
        },
        (rx, tx) => {
            if let Err(e) = rx {
                debug!(host = %target, interface = index, oid = %rx_oid, error = %e, "rx GET failed");
            }
            if let Err(e) = tx {
                debug!(host = %target, interface = index, oid = %tx_oid, error = %e, "tx GET failed");
            }
            None
        }
    }
}

/// One sampling round for one target. Returns the number of samples appended.
pub async fn sample_target<C: SnmpClient>(
    client: &C,
    discovery: &InterfaceDiscovery<C>,
    series: &TrafficSeries,
    target: &Target,
    prune_stale: bool,
) -> usize {
    let indices = discovery.list_interfaces(target).await;
    if indices.is_empty() {
        debug!(host = %target, "no enumerable interfaces");
        return 0;
    }
    let pruned = series.track_indices(target, &indices, prune_stale);
    if pruned > 0 {
        debug!(host = %target, pruned, "dropped series for vanished interfaces");
    }

    let timestamp = now_ms();
    let mut appended = 0;
    for index in indices {
        if let Some((received_octets, sent_octets)) = read_counters(client, target, index).await {
            series.append(
                target,
                index,
                CounterSample {
                    timestamp,
                    received_octets,
                    sent_octets,
                },
            );
            appended += 1;
        }
    }
    appended
}

impl<C: SnmpClient> Session for TrafficSampler<C> {
    fn kind(&self) -> SessionKind {
        SessionKind::TrafficSampling
    }

    async fn run_cycle(&self) -> CycleEvent {
        let targets_polled = self.targets.len();
        let prune_stale = self.prune_stale;

        let client = self.client.clone();
        let discovery = self.discovery.clone();
        let series = self.series.clone();
        let appended: Vec<usize> = stream::iter(self.targets.clone())
            .map(move |target| {
                let client = client.clone();
                let discovery = discovery.clone();
                let series = series.clone();
                async move {
                    sample_target(
                        client.as_ref(),
                        &discovery,
                        series.as_ref(),
                        &target,
                        prune_stale,
                    )
                    .await
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        CycleEvent {
            session: SessionKind::TrafficSampling,
            targets_polled,
            targets_updated: appended.iter().filter(|n| **n > 0).count(),
            samples_appended: appended.iter().sum(),
            finished_at: now_ms(),
        }
    }
}
