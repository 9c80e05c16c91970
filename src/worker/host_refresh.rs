// Host refresh session: GET the system group from every target and upsert the
// registry. A target that answers nothing is skipped, leaving its row untouched.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, warn};

use super::Session;
use crate::host_repo::HostRepo;
use crate::models::{CycleEvent, SessionKind, SystemFields, Target, now_ms};
use crate::snmp::{SnmpClient, oid};

pub struct HostRefreshDeps<C> {
    pub client: Arc<C>,
    pub host_repo: Arc<HostRepo>,
}

pub struct HostRefresh<C> {
    client: Arc<C>,
    host_repo: Arc<HostRepo>,
    targets: Vec<Target>,
    include_known_hosts: bool,
    max_concurrency: usize,
}

impl<C: SnmpClient> HostRefresh<C> {
    pub fn new(
        deps: HostRefreshDeps<C>,
        targets: Vec<Target>,
        include_known_hosts: bool,
        max_concurrency: usize,
    ) -> Self {
        Self {
            client: deps.client,
            host_repo: deps.host_repo,
            targets,
            include_known_hosts,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Configured targets followed by registry targets not already listed.
    async fn cycle_targets(&self) -> Vec<Target> {
        let mut out = self.targets.clone();
        if !self.include_known_hosts {
            return out;
        }
        match self.host_repo.known_targets().await {
            Ok(known) => {
                let mut seen: HashSet<Target> = out.iter().cloned().collect();
                out.extend(known.into_iter().filter(|t| seen.insert(t.clone())));
            }
            Err(e) => {
                warn!(error = %e, operation = "known_targets", "could not read registry targets");
            }
        }
        out
    }
}

/// GET the four persisted system-group fields. Each is fetched independently;
/// a failed field is `None`.
pub async fn poll_system_fields<C: SnmpClient>(client: &C, target: &Target) -> SystemFields {
    let (sys_descr, sys_name, sys_up_time, sys_location) = tokio::join!(
        fetch_field(client, target, "sysDescr", oid::SYS_DESCR),
        fetch_field(client, target, "sysName", oid::SYS_NAME),
        fetch_field(client, target, "sysUpTime", oid::SYS_UP_TIME),
        fetch_field(client, target, "sysLocation", oid::SYS_LOCATION),
    );
    SystemFields {
        sys_descr,
        sys_name,
        sys_up_time,
        sys_location,
    }
}

async fn fetch_field<C: SnmpClient>(
    client: &C,
    target: &Target,
    name: &str,
    oid: &str,
) -> Option<String> {
    match client.scalar_get(target, oid).await {
        Ok(value) => Some(value.to_string()),
        Err(e) => {
            debug!(host = %target, field = name, oid = %oid, error = %e, "GET failed");
            None
        }
    }
}

/// Poll one target and upsert it. Returns true if the registry was written.
pub async fn refresh_target<C: SnmpClient>(
    client: &C,
    host_repo: &HostRepo,
    target: &Target,
) -> bool {
    let fields = poll_system_fields(client, target).await;
    if !fields.has_data() {
        debug!(host = %target, "no system fields answered, skipping");
        return false;
    }
    match host_repo.upsert(target, &fields).await {
        Ok(record) => {
            debug!(host = %target, id = record.id, "host upserted");
            true
        }
        Err(e) => {
            warn!(host = %target, error = %e, operation = "upsert", "registry write failed");
            false
        }
    }
}

impl<C: SnmpClient> Session for HostRefresh<C> {
    fn kind(&self) -> SessionKind {
        SessionKind::HostRefresh
    }

    async fn run_cycle(&self) -> CycleEvent {
        let targets = self.cycle_targets().await;
        let targets_polled = targets.len();

        let client = self.client.clone();
        let host_repo = self.host_repo.clone();
        let updated: Vec<bool> = stream::iter(targets)
            .map(move |target| {
                let client = client.clone();
                let host_repo = host_repo.clone();
                async move { refresh_target(client.as_ref(), host_repo.as_ref(), &target).await }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        CycleEvent {
            session: SessionKind::HostRefresh,
            targets_polled,
            targets_updated: updated.into_iter().filter(|u| *u).count(),
            samples_appended: 0,
            finished_at: now_ms(),
        }
    }
}
