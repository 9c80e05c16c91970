// Shared test helpers: a scripted in-memory SNMP agent and a temp registry

#![allow(dead_code)]

use hostmon::error::QueryError;
use hostmon::host_repo::HostRepo;
use hostmon::models::Target;
use hostmon::snmp::{SnmpClient, SnmpValue, WalkRow, oid};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Answers from a table; anything not scripted times out.
#[derive(Default)]
pub struct ScriptedClient {
    scalars: Mutex<HashMap<(Target, String), Result<SnmpValue, QueryError>>>,
    walks: Mutex<HashMap<(Target, String), Result<Vec<WalkRow>, QueryError>>>,
    gets: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scalar(&self, target: &Target, oid: &str, value: SnmpValue) {
        self.scalars
            .lock()
            .unwrap()
            .insert((target.clone(), oid.to_string()), Ok(value));
    }

    pub fn fail_scalar(&self, target: &Target, oid: &str, err: QueryError) {
        self.scalars
            .lock()
            .unwrap()
            .insert((target.clone(), oid.to_string()), Err(err));
    }

    pub fn set_walk(&self, target: &Target, base: &str, rows: Vec<WalkRow>) {
        self.walks
            .lock()
            .unwrap()
            .insert((target.clone(), base.to_string()), Ok(rows));
    }

    pub fn fail_walk(&self, target: &Target, base: &str, err: QueryError) {
        self.walks
            .lock()
            .unwrap()
            .insert((target.clone(), base.to_string()), Err(err));
    }

    /// Script ifIndex rows `1..` with the given index values.
    pub fn set_interfaces(&self, target: &Target, indices: &[u32]) {
        let rows = indices
            .iter()
            .map(|i| WalkRow {
                index: i.to_string(),
                value: SnmpValue::Integer(i64::from(*i)),
            })
            .collect();
        self.set_walk(target, oid::IF_INDEX, rows);
    }

    pub fn set_counters(&self, target: &Target, index: u32, rx: u64, tx: u64) {
        self.set_scalar(target, &oid::instance(oid::IF_IN_OCTETS, index), SnmpValue::Counter(rx));
        self.set_scalar(target, &oid::instance(oid::IF_OUT_OCTETS, index), SnmpValue::Counter(tx));
    }

    pub fn set_system(&self, target: &Target, descr: &str, name: &str, uptime: u32, location: &str) {
        self.set_scalar(target, oid::SYS_DESCR, SnmpValue::Text(descr.into()));
        self.set_scalar(target, oid::SYS_NAME, SnmpValue::Text(name.into()));
        self.set_scalar(target, oid::SYS_UP_TIME, SnmpValue::Timeticks(uptime));
        self.set_scalar(target, oid::SYS_LOCATION, SnmpValue::Text(location.into()));
    }

    pub fn clear(&self) {
        self.scalars.lock().unwrap().clear();
        self.walks.lock().unwrap().clear();
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl SnmpClient for ScriptedClient {
    async fn scalar_get(&self, target: &Target, oid: &str) -> Result<SnmpValue, QueryError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.scalars
            .lock()
            .unwrap()
            .get(&(target.clone(), oid.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(QueryError::unreachable("SNMP GET timeout")))
    }

    async fn table_walk(&self, target: &Target, base_oid: &str) -> Result<Vec<WalkRow>, QueryError> {
        self.walks
            .lock()
            .unwrap()
            .get(&(target.clone(), base_oid.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(QueryError::unreachable("SNMP GETNEXT timeout")))
    }
}

/// Fresh initialised registry in a temp dir (keep the TempDir alive for the test).
pub async fn temp_repo() -> (TempDir, HostRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hosts.db");
    let repo = HostRepo::connect(path.to_str().unwrap(), 4).await.unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

pub fn target(port: u16) -> Target {
    Target::new("127.0.0.1", port)
}
