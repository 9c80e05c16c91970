// SNMP agent identity: (address, port)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// One SNMP agent instance. Natural key of the host registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub address: String,
    pub port: u16,
}

impl Target {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// `host:port` form accepted by the UDP socket layer (IPv6 literals bracketed).
    pub fn socket_addr(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.socket_addr())
    }
}

impl FromStr for Target {
    type Err = RegistryError;

    /// Parses `address:port`, `[v6]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (address, port) = if let Some(rest) = s.strip_prefix('[') {
            let (addr, tail) = rest
                .split_once(']')
                .ok_or_else(|| RegistryError::Invalid(format!("unterminated '[' in {s:?}")))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| RegistryError::Invalid(format!("missing port in {s:?}")))?;
            (addr, port)
        } else {
            s.rsplit_once(':')
                .ok_or_else(|| RegistryError::Invalid(format!("missing port in {s:?}")))?
        };
        if address.is_empty() {
            return Err(RegistryError::Invalid(format!("missing address in {s:?}")));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| RegistryError::Invalid(format!("port must be numeric, got {port:?}")))?;
        if port == 0 {
            return Err(RegistryError::Invalid("port must be between 1 and 65535".into()));
        }
        Ok(Self::new(address, port))
    }
}
