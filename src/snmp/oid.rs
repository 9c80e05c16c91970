use snmp2::Oid;

use crate::error::QueryError;

// SNMPv2-MIB system group
pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";
pub const SYS_OBJECT_ID: &str = "1.3.6.1.2.1.1.2.0";
pub const SYS_UP_TIME: &str = "1.3.6.1.2.1.1.3.0";
pub const SYS_CONTACT: &str = "1.3.6.1.2.1.1.4.0";
pub const SYS_NAME: &str = "1.3.6.1.2.1.1.5.0";
pub const SYS_LOCATION: &str = "1.3.6.1.2.1.1.6.0";

// IF-MIB ifTable columns
pub const IF_INDEX: &str = "1.3.6.1.2.1.2.2.1.1";
pub const IF_IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10";
pub const IF_OUT_OCTETS: &str = "1.3.6.1.2.1.2.2.1.16";
pub const IF_PHYS_ADDRESS: &str = "1.3.6.1.2.1.2.2.1.6";

/// The six system-group scalars with their MIB names, in MIB order.
pub const SYSTEM_GROUP: [(&str, &str); 6] = [
    ("sysDescr", SYS_DESCR),
    ("sysObjectID", SYS_OBJECT_ID),
    ("sysUpTime", SYS_UP_TIME),
    ("sysContact", SYS_CONTACT),
    ("sysName", SYS_NAME),
    ("sysLocation", SYS_LOCATION),
];

/// Parse an OID string (e.g., "1.3.6.1.2.1.1.3.0") into an snmp2::Oid.
pub fn parse_oid(oid_str: &str) -> Result<Oid<'static>, QueryError> {
    oid_str
        .parse::<Oid>()
        .map(|oid| oid.to_owned())
        .map_err(|e| QueryError::protocol(format!("invalid OID '{}': {:?}", oid_str, e)))
}

/// Convert an snmp2::Oid back to a dotted string representation.
pub fn oid_to_string(oid: &Oid) -> String {
    oid.to_id_string()
}

/// Column instance OID: `<base>.<index>`.
pub fn instance(base: &str, index: impl std::fmt::Display) -> String {
    format!("{}.{}", base.trim_end_matches('.'), index)
}

/// Row index of `oid` under `base` ("1.3.6.1.2.1.2.2.1.1.7" under ifIndex -> "7").
/// `None` when `oid` is not strictly below `base`.
pub fn index_suffix<'a>(base: &str, oid: &'a str) -> Option<&'a str> {
    let base = base.trim_end_matches('.');
    oid.strip_prefix(base)?
        .strip_prefix('.')
        .filter(|rest| !rest.is_empty())
}

/// Octet strings under these columns are addresses and always render as hex.
pub fn is_physical_address(oid: &str) -> bool {
    index_suffix(IF_PHYS_ADDRESS, oid).is_some()
}
