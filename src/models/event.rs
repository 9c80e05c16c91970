// Completion signal emitted after every polling cycle

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    HostRefresh,
    TrafficSampling,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::HostRefresh => f.write_str("host_refresh"),
            SessionKind::TrafficSampling => f.write_str("traffic_sampling"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleEvent {
    pub session: SessionKind,
    pub targets_polled: usize,
    /// Host refresh: registry rows upserted. Traffic: targets with at least one sample.
    pub targets_updated: usize,
    pub samples_appended: usize,
    pub finished_at: i64,
}
