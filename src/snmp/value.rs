// Typed SNMP values and their display rendering

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum SnmpValue {
    Integer(i64),
    /// Counter32, Counter64, Unsigned32/Gauge32.
    Counter(u64),
    Timeticks(u32),
    /// Printable octet string.
    Text(String),
    /// Non-printable octet string (physical addresses and the like).
    Bytes(Vec<u8>),
    ObjectId(String),
    IpAddress([u8; 4]),
}

impl SnmpValue {
    /// Octet strings that decode as printable UTF-8 become `Text`, everything else `Bytes`.
    pub fn from_octets(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text)
                if text
                    .chars()
                    .all(|c| !c.is_control() || c == '\n' || c == '\r' || c == '\t') =>
            {
                SnmpValue::Text(text.to_string())
            }
            _ => SnmpValue::Bytes(bytes.to_vec()),
        }
    }

    /// Numeric view for counters and indices. Text is parsed; negative integers are rejected.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Integer(n) => u64::try_from(*n).ok(),
            SnmpValue::Counter(n) => Some(*n),
            SnmpValue::Timeticks(n) => Some(u64::from(*n)),
            SnmpValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Colon-separated uppercase hex pairs, e.g. `00:1A:2B:3C:4D:5E`.
pub fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Display for SnmpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpValue::Integer(n) => write!(f, "{}", n),
            SnmpValue::Counter(n) => write!(f, "{}", n),
            SnmpValue::Timeticks(n) => write!(f, "{}", n),
            SnmpValue::Text(s) => f.write_str(s),
            SnmpValue::Bytes(b) => f.write_str(&hex_colon(b)),
            SnmpValue::ObjectId(oid) => f.write_str(oid),
            SnmpValue::IpAddress(ip) => write!(f, "{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]),
        }
    }
}
