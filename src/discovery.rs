// Interface discovery: walk ifIndex and keep the indices the filter accepts.
// A failed or empty walk yields no interfaces; it is never an error for the caller.

use std::sync::Arc;

use tracing::debug;

use crate::models::{InterfaceIndex, Target};
use crate::snmp::{SnmpClient, oid};

type IndexFilter = Arc<dyn Fn(InterfaceIndex) -> bool + Send + Sync>;

pub struct InterfaceDiscovery<C> {
    client: Arc<C>,
    keep: IndexFilter,
}

impl<C> Clone for InterfaceDiscovery<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            keep: self.keep.clone(),
        }
    }
}

impl<C: SnmpClient> InterfaceDiscovery<C> {
    /// Discovery that keeps every index.
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            keep: Arc::new(|_| true),
        }
    }

    /// Discovery that drops the listed indices (e.g. `[1]` for loopback).
    pub fn excluding(client: Arc<C>, excluded: Vec<InterfaceIndex>) -> Self {
        Self::new(client).with_filter(move |index| !excluded.contains(&index))
    }

    /// Replace the filter; `keep(index)` returns true for indices to report.
    pub fn with_filter(
        mut self,
        keep: impl Fn(InterfaceIndex) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.keep = Arc::new(keep);
        self
    }

    pub async fn list_interfaces(&self, target: &Target) -> Vec<InterfaceIndex> {
        let rows = match self.client.table_walk(target, oid::IF_INDEX).await {
            Ok(rows) => rows,
            Err(e) => {
                debug!(host = %target, error = %e, operation = "list_interfaces", "ifIndex walk failed");
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(index) = row
                .value
                .as_u64()
                .and_then(|n| InterfaceIndex::try_from(n).ok())
            else {
                debug!(host = %target, row = %row.index, value = %row.value, "non-integer ifIndex, skipping");
                continue;
            };
            if (self.keep)(index) {
                out.push(index);
            }
        }
        out
    }
}
