// Text and JSON rendering of registry rows and traffic series for the console.

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::inventory::DeviceInventory;
use crate::models::{CounterSample, HostRecord, InterfaceIndex, Target, UNKNOWN};
use crate::traffic::TrafficSeries;

const HOST_HEADERS: [&str; 9] = [
    "ID",
    "Address",
    "Port",
    "Description",
    "Name",
    "UpTime",
    "Location",
    "Custom",
    "Last Updated",
];

/// Local `YYYY-mm-dd HH:MM:SS` for a millisecond timestamp.
pub fn format_timestamp(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

fn format_clock(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

fn field(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN.to_string())
}

fn host_row(h: &HostRecord) -> [String; 9] {
    [
        h.id.to_string(),
        h.address.clone(),
        h.port.to_string(),
        field(&h.sys_descr),
        field(&h.sys_name),
        field(&h.sys_up_time),
        field(&h.sys_location),
        h.custom_data.clone(),
        format_timestamp(h.last_updated),
    ]
}

/// Aligned plain-text table with the registry columns.
pub fn render_hosts_table(hosts: &[HostRecord]) -> String {
    let rows: Vec<[String; 9]> = hosts.iter().map(host_row).collect();
    let mut widths = HOST_HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, HOST_HEADERS.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &rows {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// One line per sample: `HH:MM:SS  rx=<n>  tx=<n>`, oldest first.
pub fn render_series(target: &Target, index: InterfaceIndex, samples: &[CounterSample]) -> String {
    let mut out = format!("{} interface {}\n", target, index);
    if samples.is_empty() {
        out.push_str("  (no samples)\n");
    }
    for s in samples {
        out.push_str(&format!(
            "  {}  rx={}  tx={}\n",
            format_clock(s.timestamp),
            s.received_octets,
            s.sent_octets
        ));
    }
    out
}

/// Every tracked interface of every target.
pub fn render_traffic(series: &TrafficSeries) -> String {
    let mut out = String::new();
    for target in series.targets() {
        for index in series.known_indices(&target) {
            out.push_str(&render_series(&target, index, &series.snapshot(&target, index)));
        }
    }
    out
}

/// System group as `name: value` lines, then one line per interface address.
pub fn render_inventory(inventory: &DeviceInventory) -> String {
    let mut out = format!("Device {}\n", inventory.target);
    for (name, value) in &inventory.system {
        out.push_str(&format!("  {}: {}\n", name, field(value)));
    }
    if inventory.interfaces.is_empty() {
        out.push_str("  no interfaces found\n");
        return out;
    }
    for iface in &inventory.interfaces {
        out.push_str(&format!(
            "  interface {} address {}\n",
            iface.index,
            field(&iface.phys_address)
        ));
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InterfaceSeriesJson {
    target: String,
    interface: InterfaceIndex,
    samples: Vec<CounterSample>,
}

pub fn hosts_json(hosts: &[HostRecord]) -> serde_json::Result<String> {
    serde_json::to_string(hosts)
}

pub fn traffic_json(series: &TrafficSeries) -> serde_json::Result<String> {
    let mut all = Vec::new();
    for target in series.targets() {
        for index in series.known_indices(&target) {
            all.push(InterfaceSeriesJson {
                target: target.to_string(),
                interface: index,
                samples: series.snapshot(&target, index),
            });
        }
    }
    serde_json::to_string(&all)
}
