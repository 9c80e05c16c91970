// One-shot device description: the whole system group plus the physical address
// of every discovered interface. Nothing here is persisted.

use serde::Serialize;
use tracing::debug;

use crate::discovery::InterfaceDiscovery;
use crate::models::{InterfaceIndex, Target};
use crate::snmp::{SnmpClient, oid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceInfo {
    pub index: InterfaceIndex,
    /// `AA:BB:..` hex, `None` if the agent did not answer.
    pub phys_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInventory {
    pub target: Target,
    /// `(MIB name, value)` for every system-group scalar, in MIB order.
    pub system: Vec<(String, Option<String>)>,
    pub interfaces: Vec<InterfaceInfo>,
}

impl DeviceInventory {
    /// True when the agent answered at least one system scalar.
    pub fn is_reachable(&self) -> bool {
        self.system.iter().any(|(_, v)| v.is_some())
    }
}

pub async fn describe_device<C: SnmpClient>(
    client: &C,
    discovery: &InterfaceDiscovery<C>,
    target: &Target,
) -> DeviceInventory {
    let mut system = Vec::with_capacity(oid::SYSTEM_GROUP.len());
    for (name, scalar) in oid::SYSTEM_GROUP {
        let value = match client.scalar_get(target, scalar).await {
            Ok(v) => Some(v.to_string()),
            Err(e) => {
                debug!(host = %target, field = name, error = %e, "GET failed");
                None
            }
        };
        system.push((name.to_string(), value));
    }

    let mut interfaces = Vec::new();
    for index in discovery.list_interfaces(target).await {
        let phys_address = client
            .scalar_get(target, &oid::instance(oid::IF_PHYS_ADDRESS, index))
            .await
            .map(|v| v.to_string())
            .ok();
        interfaces.push(InterfaceInfo {
            index,
            phys_address,
        });
    }

    DeviceInventory {
        target: target.clone(),
        system,
        interfaces,
    }
}
