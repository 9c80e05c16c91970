use std::time::Duration;

use snmp2::{AsyncSession, Value};
use tokio::time::timeout;

use super::oid::{index_suffix, is_physical_address, oid_to_string, parse_oid};
use super::{SnmpClient, SnmpValue, WalkRow};
use crate::config::{SnmpConfig, SnmpVersion};
use crate::error::QueryError;
use crate::models::Target;

/// SNMPv1 error-status noSuchName; on GETNEXT it marks the end of the MIB view.
const ERR_NO_SUCH_NAME: u32 = 2;

/// Community-string SNMP client over UDP (one session per call).
#[derive(Debug, Clone)]
pub struct Snmp2Client {
    community: Vec<u8>,
    version: SnmpVersion,
    request_timeout: Duration,
    max_walk_rows: usize,
}

impl Snmp2Client {
    pub fn new(config: &SnmpConfig) -> Self {
        Self {
            community: config.community.as_bytes().to_vec(),
            version: config.version,
            request_timeout: Duration::from_millis(config.timeout_ms),
            max_walk_rows: config.max_walk_rows,
        }
    }

    async fn create_session(&self, target: &Target) -> Result<AsyncSession, QueryError> {
        let addr = target.socket_addr();
        let session = match self.version {
            SnmpVersion::V1 => AsyncSession::new_v1(addr.as_str(), &self.community, 0).await,
            SnmpVersion::V2c => AsyncSession::new_v2c(addr.as_str(), &self.community, 0).await,
        };
        session.map_err(|e| QueryError::unreachable(format!("session to {}: {}", target, e)))
    }
}

impl SnmpClient for Snmp2Client {
    async fn scalar_get(&self, target: &Target, oid_str: &str) -> Result<SnmpValue, QueryError> {
        let oid = parse_oid(oid_str)?;
        let mut session = self.create_session(target).await?;

        let response = timeout(self.request_timeout, session.get(&oid))
            .await
            .map_err(|_| QueryError::unreachable("SNMP GET timeout"))?
            .map_err(|e| QueryError::unreachable(format!("SNMP GET error: {}", e)))?;

        if response.error_status != 0 {
            return Err(QueryError::protocol(format!(
                "error status {} at index {}",
                response.error_status, response.error_index
            )));
        }

        let Some((resp_oid, value)) = response.varbinds.into_iter().next() else {
            return Err(QueryError::protocol("empty response"));
        };
        convert_value(&oid_to_string(&resp_oid), &value)
    }

    async fn table_walk(&self, target: &Target, base_str: &str) -> Result<Vec<WalkRow>, QueryError> {
        let base = parse_oid(base_str)?;
        let base_string = oid_to_string(&base);
        let mut rows = Vec::new();
        let mut current_oid = base.clone();
        let mut session = self.create_session(target).await?;

        loop {
            let response = timeout(self.request_timeout, session.getnext(&current_oid))
                .await
                .map_err(|_| QueryError::unreachable("SNMP GETNEXT timeout"))?
                .map_err(|e| QueryError::unreachable(format!("SNMP GETNEXT error: {}", e)))?;

            if response.error_status != 0 {
                if self.version == SnmpVersion::V1 && response.error_status == ERR_NO_SUCH_NAME {
                    break;
                }
                return Err(QueryError::protocol(format!(
                    "error status {} at index {}",
                    response.error_status, response.error_index
                )));
            }

            let Some((resp_oid, value)) = response.varbinds.into_iter().next() else {
                break;
            };

            // Stop once the agent steps outside the subtree or runs off the MIB
            let resp_string = oid_to_string(&resp_oid);
            let Some(index) = index_suffix(&base_string, &resp_string) else {
                break;
            };
            if matches!(value, Value::EndOfMibView) {
                break;
            }

            rows.push(WalkRow {
                index: index.to_string(),
                value: convert_value(&resp_string, &value)?,
            });
            if rows.len() > self.max_walk_rows {
                return Err(QueryError::protocol(format!(
                    "walk of {} exceeded {} rows",
                    base_string, self.max_walk_rows
                )));
            }

            current_oid = resp_oid.to_owned();
        }

        Ok(rows)
    }
}

/// Convert an SNMP Value to an owned SnmpValue; exception values are protocol errors.
/// Octets under a physical-address column stay raw bytes even when printable.
fn convert_value(oid: &str, value: &Value) -> Result<SnmpValue, QueryError> {
    match value {
        Value::Integer(n) => Ok(SnmpValue::Integer(*n)),
        Value::OctetString(s) if is_physical_address(oid) => Ok(SnmpValue::Bytes(s.to_vec())),
        Value::OctetString(s) => Ok(SnmpValue::from_octets(s)),
        Value::ObjectIdentifier(oid) => Ok(SnmpValue::ObjectId(oid_to_string(oid))),
        Value::IpAddress(ip) => Ok(SnmpValue::IpAddress(*ip)),
        Value::Counter32(n) => Ok(SnmpValue::Counter(u64::from(*n))),
        Value::Unsigned32(n) => Ok(SnmpValue::Counter(u64::from(*n))),
        Value::Counter64(n) => Ok(SnmpValue::Counter(*n)),
        Value::Timeticks(n) => Ok(SnmpValue::Timeticks(*n)),
        Value::NoSuchObject => Err(QueryError::protocol("noSuchObject")),
        Value::NoSuchInstance => Err(QueryError::protocol("noSuchInstance")),
        Value::EndOfMibView => Err(QueryError::protocol("endOfMibView")),
        Value::Null => Err(QueryError::protocol("null value")),
        _ => Err(QueryError::protocol("unsupported value type")),
    }
}
