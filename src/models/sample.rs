// Interface counter samples

use serde::{Deserialize, Serialize};

/// Interface index as reported by the agent's ifIndex column.
pub type InterfaceIndex = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub received_octets: u64,
    pub sent_octets: u64,
}
