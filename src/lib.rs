// Library for tests to access modules

pub mod config;
pub mod discovery;
pub mod error;
pub mod host_repo;
pub mod inventory;
pub mod models;
pub mod report;
pub mod snmp;
pub mod traffic;
pub mod version;
pub mod worker;
