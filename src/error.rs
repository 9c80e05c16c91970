// Error taxonomy for SNMP queries and registry operations

use std::fmt;
use thiserror::Error;

/// How a query failed, as far as callers need to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// No usable response: timeout, transport failure, undecodable reply.
    Unreachable,
    /// The agent answered with an error status or an exception value.
    Protocol,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::Unreachable => f.write_str("unreachable"),
            QueryErrorKind::Protocol => f.write_str("protocol"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub detail: String,
}

impl QueryError {
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self {
            kind: QueryErrorKind::Unreachable,
            detail: detail.into(),
        }
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self {
            kind: QueryErrorKind::Protocol,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("host {0} not found")]
    NotFound(i64),

    #[error("another host already uses {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
