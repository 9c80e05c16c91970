use serde::Deserialize;

use crate::models::Target;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub snmp: SnmpConfig,
    pub database: DatabaseConfig,
    pub host_refresh: HostRefreshConfig,
    #[serde(default)]
    pub traffic: TrafficConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// SNMP protocol version used for every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SnmpVersion {
    #[default]
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2c")]
    V2c,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnmpConfig {
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default)]
    pub version: SnmpVersion,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound on rows per walk; agents that never leave the subtree fail the walk.
    #[serde(default = "default_max_walk_rows")]
    pub max_walk_rows: usize,
}

fn default_community() -> String {
    "public".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_max_walk_rows() -> usize {
    4096
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: default_community(),
            version: SnmpVersion::default(),
            timeout_ms: default_timeout_ms(),
            max_walk_rows: default_max_walk_rows(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostRefreshConfig {
    #[serde(default = "default_host_refresh_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Also poll every target already present in the registry.
    #[serde(default = "default_true")]
    pub include_known_hosts: bool,
    /// Sweep `address:port_start..=port_end`.
    pub address: Option<String>,
    pub port_start: Option<u16>,
    pub port_end: Option<u16>,
    /// Extra targets, `ip:port`.
    #[serde(default)]
    pub targets: Vec<String>,
}

fn default_host_refresh_interval_secs() -> u64 {
    300
}

fn default_max_concurrency() -> usize {
    8
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficConfig {
    #[serde(default = "default_traffic_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Samples kept per (target, interface).
    #[serde(default = "default_window")]
    pub window: usize,
    /// Interface indices skipped by discovery (1 is usually loopback).
    #[serde(default = "default_exclude_indices")]
    pub exclude_indices: Vec<u32>,
    /// Drop series for interfaces that vanished from a non-empty discovery.
    #[serde(default = "default_true")]
    pub prune_stale_interfaces: bool,
    #[serde(default)]
    pub targets: Vec<String>,
}

fn default_traffic_interval_secs() -> u64 {
    10
}

fn default_window() -> usize {
    10
}

fn default_exclude_indices() -> Vec<u32> {
    vec![1]
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_traffic_interval_secs(),
            max_concurrency: default_max_concurrency(),
            window: default_window(),
            exclude_indices: default_exclude_indices(),
            prune_stale_interfaces: true,
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub format: ReportFormat,
    /// Print the full system group and interface addresses of every configured
    /// host target once at startup.
    #[serde(default)]
    pub describe_on_start: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ReportFormat::default(),
            describe_on_start: false,
        }
    }
}

impl HostRefreshConfig {
    /// Configured range plus explicit targets, deduplicated, in port order.
    pub fn configured_targets(&self) -> anyhow::Result<Vec<Target>> {
        let mut out = parse_targets(&self.targets)?;
        if let (Some(address), Some(start), Some(end)) =
            (&self.address, self.port_start, self.port_end)
        {
            out.extend((start..=end).map(|port| Target::new(address.clone(), port)));
        }
        out.sort();
        out.dedup();
        Ok(out)
    }
}

impl TrafficConfig {
    pub fn configured_targets(&self) -> anyhow::Result<Vec<Target>> {
        let mut out = parse_targets(&self.targets)?;
        out.sort();
        out.dedup();
        Ok(out)
    }
}

fn parse_targets(raw: &[String]) -> anyhow::Result<Vec<Target>> {
    raw.iter()
        .map(|s| {
            s.parse::<Target>()
                .map_err(|e| anyhow::anyhow!("target {:?}: {}", s, e))
        })
        .collect()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.snmp.community.is_empty(),
            "snmp.community must be non-empty"
        );
        anyhow::ensure!(
            self.snmp.timeout_ms > 0,
            "snmp.timeout_ms must be > 0, got {}",
            self.snmp.timeout_ms
        );
        anyhow::ensure!(
            self.snmp.max_walk_rows > 0,
            "snmp.max_walk_rows must be > 0, got {}",
            self.snmp.max_walk_rows
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.host_refresh.interval_secs > 0,
            "host_refresh.interval_secs must be > 0, got {}",
            self.host_refresh.interval_secs
        );
        anyhow::ensure!(
            self.host_refresh.max_concurrency > 0,
            "host_refresh.max_concurrency must be > 0, got {}",
            self.host_refresh.max_concurrency
        );
        match (
            &self.host_refresh.address,
            self.host_refresh.port_start,
            self.host_refresh.port_end,
        ) {
            (None, None, None) => {}
            (Some(address), Some(start), Some(end)) => {
                anyhow::ensure!(
                    !address.is_empty(),
                    "host_refresh.address must be non-empty"
                );
                anyhow::ensure!(
                    start > 0,
                    "host_refresh.port_start must be between 1 and 65535, got {}",
                    start
                );
                anyhow::ensure!(
                    start <= end,
                    "host_refresh.port_start ({}) must be <= port_end ({})",
                    start,
                    end
                );
            }
            _ => anyhow::bail!(
                "host_refresh.address, port_start and port_end must be set together"
            ),
        }
        self.host_refresh.configured_targets()?;
        anyhow::ensure!(
            self.traffic.interval_secs > 0,
            "traffic.interval_secs must be > 0, got {}",
            self.traffic.interval_secs
        );
        anyhow::ensure!(
            self.traffic.max_concurrency > 0,
            "traffic.max_concurrency must be > 0, got {}",
            self.traffic.max_concurrency
        );
        anyhow::ensure!(
            self.traffic.window > 0,
            "traffic.window must be > 0, got {}",
            self.traffic.window
        );
        self.traffic.configured_targets()?;
        Ok(())
    }
}
