// Host registry row and the scalar fields a poll produces

use serde::{Deserialize, Serialize};

use super::Target;

/// Rendered in place of a field the agent never answered.
pub const UNKNOWN: &str = "unknown";

/// One row of the host registry. `custom_data` is user-owned and never written by polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    pub id: i64,
    pub address: String,
    pub port: u16,
    pub sys_descr: Option<String>,
    pub sys_name: Option<String>,
    pub sys_up_time: Option<String>,
    pub sys_location: Option<String>,
    pub custom_data: String,
    /// Milliseconds since the Unix epoch.
    pub last_updated: i64,
}

impl HostRecord {
    pub fn target(&self) -> Target {
        Target::new(self.address.clone(), self.port)
    }
}

/// Scalar system-group values fetched in one poll. `None` = not answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemFields {
    pub sys_descr: Option<String>,
    pub sys_name: Option<String>,
    pub sys_up_time: Option<String>,
    pub sys_location: Option<String>,
}

impl SystemFields {
    /// True when at least one field carries a non-empty value.
    pub fn has_data(&self) -> bool {
        [
            &self.sys_descr,
            &self.sys_name,
            &self.sys_up_time,
            &self.sys_location,
        ]
        .into_iter()
        .any(|f| f.as_deref().is_some_and(|s| !s.is_empty()))
    }
}
