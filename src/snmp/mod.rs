// SNMP client adapter: one GET or one GETNEXT walk against a single target.
// Every failure is folded into QueryError; nothing is retried here.

mod client;
pub mod oid;
mod value;

pub use client::Snmp2Client;
pub use value::{SnmpValue, hex_colon};

use std::future::Future;

use crate::error::QueryError;
use crate::models::Target;

/// One row of a table walk: the OID suffix below the walked column and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRow {
    pub index: String,
    pub value: SnmpValue,
}

/// Query capability the pollers depend on. [`Snmp2Client`] is the UDP implementation.
pub trait SnmpClient: Send + Sync + 'static {
    /// Exactly one GET for `oid`.
    fn scalar_get(
        &self,
        target: &Target,
        oid: &str,
    ) -> impl Future<Output = Result<SnmpValue, QueryError>> + Send;

    /// GETNEXT from `base_oid` until a returned OID leaves the subtree.
    /// Any step error fails the whole walk; rows gathered so far are discarded.
    fn table_walk(
        &self,
        target: &Target,
        base_oid: &str,
    ) -> impl Future<Output = Result<Vec<WalkRow>, QueryError>> + Send;
}
