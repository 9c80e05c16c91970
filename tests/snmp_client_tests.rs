// Snmp2Client against a loopback UDP agent that answers from a small in-memory MIB

mod common;

use common::temp_repo;
use hostmon::config::{SnmpConfig, SnmpVersion};
use hostmon::error::QueryErrorKind;
use hostmon::models::{SessionKind, Target};
use hostmon::snmp::{Snmp2Client, SnmpClient, SnmpValue, oid};
use hostmon::worker::{self, HostRefresh, HostRefreshDeps, SessionConfig};
use snmp2::{MessageType, Pdu};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, timeout};

const GEN_ERR: u32 = 5;
const NO_SUCH_NAME: u32 = 2;

// ---- minimal BER encoding for GetResponse messages ----

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes: Vec<u8> = len.to_be_bytes().into_iter().skip_while(|b| *b == 0).collect();
        out.push(0x80 | bytes.len() as u8);
        out.extend(bytes);
    }
    out.extend_from_slice(content);
    out
}

fn ber_int(tag: u8, n: i64) -> Vec<u8> {
    let mut bytes = n.to_be_bytes().to_vec();
    while bytes.len() > 1
        && ((bytes[0] == 0x00 && bytes[1] & 0x80 == 0) || (bytes[0] == 0xff && bytes[1] & 0x80 != 0))
    {
        bytes.remove(0);
    }
    tlv(tag, &bytes)
}

fn arcs(oid: &str) -> Vec<u32> {
    oid.split('.').map(|a| a.parse().unwrap()).collect()
}

fn ber_oid(oid: &str) -> Vec<u8> {
    let arcs = arcs(oid);
    let mut body = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        let mut groups = vec![(arc & 0x7f) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            groups.push((rest & 0x7f) as u8 | 0x80);
            rest >>= 7;
        }
        groups.reverse();
        body.extend(groups);
    }
    tlv(0x06, &body)
}

#[derive(Clone)]
enum AgentValue {
    Int(i64),
    Octets(Vec<u8>),
    Counter32(u32),
    Null,
    EndOfMibView,
}

impl AgentValue {
    fn encode(&self) -> Vec<u8> {
        match self {
            AgentValue::Int(n) => ber_int(0x02, *n),
            AgentValue::Octets(b) => tlv(0x04, b),
            AgentValue::Counter32(n) => ber_int(0x41, i64::from(*n)),
            AgentValue::Null => vec![0x05, 0x00],
            AgentValue::EndOfMibView => vec![0x82, 0x00],
        }
    }
}

fn get_response(
    version: i64,
    community: &[u8],
    req_id: i32,
    status: u32,
    varbind: (&str, &AgentValue),
) -> Vec<u8> {
    let vb = tlv(0x30, &[ber_oid(varbind.0), varbind.1.encode()].concat());
    let pdu = [
        ber_int(0x02, i64::from(req_id)),
        ber_int(0x02, i64::from(status)),
        ber_int(0x02, if status == 0 { 0 } else { 1 }),
        tlv(0x30, &vb),
    ]
    .concat();
    let msg = [ber_int(0x02, version), tlv(0x04, community), tlv(0xa2, &pdu)].concat();
    tlv(0x30, &msg)
}

// ---- agent ----

#[derive(Clone, Default)]
struct Mib {
    /// Sorted by numeric arcs.
    objects: Vec<(String, AgentValue)>,
    /// GETNEXT on this OID answers genErr.
    fail_getnext_at: Option<String>,
}

impl Mib {
    fn with(mut self, oid: &str, value: AgentValue) -> Self {
        self.objects.push((oid.to_string(), value));
        self.objects.sort_by_key(|(o, _)| arcs(o));
        self
    }

    fn failing_at(mut self, oid: &str) -> Self {
        self.fail_getnext_at = Some(oid.to_string());
        self
    }

    fn answer(&self, request: &[u8]) -> Option<Vec<u8>> {
        let pdu = Pdu::from_bytes(request).ok()?;
        let version = pdu.version().ok()? as i64;
        let (req_oid, _) = pdu.varbinds.clone().next()?;
        let requested = req_oid.to_id_string();
        let reply = |status: u32, oid: &str, value: &AgentValue| {
            Some(get_response(version, pdu.community, pdu.req_id, status, (oid, value)))
        };
        match pdu.message_type {
            MessageType::GetRequest => match self.objects.iter().find(|(o, _)| *o == requested) {
                Some((o, v)) => reply(0, o.as_str(), v),
                None => reply(NO_SUCH_NAME, requested.as_str(), &AgentValue::Null),
            },
            MessageType::GetNextRequest => {
                if self.fail_getnext_at.as_deref() == Some(requested.as_str()) {
                    return reply(GEN_ERR, requested.as_str(), &AgentValue::Null);
                }
                let after = arcs(&requested);
                match self.objects.iter().find(|(o, _)| arcs(o) > after) {
                    Some((o, v)) => reply(0, o.as_str(), v),
                    None if version == 0 => reply(NO_SUCH_NAME, requested.as_str(), &AgentValue::Null),
                    None => reply(0, requested.as_str(), &AgentValue::EndOfMibView),
                }
            }
            _ => None,
        }
    }
}

/// Serve `mib` on a loopback port until the test ends.
async fn start_agent(mib: Mib) -> Target {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 65_535];
        loop {
            let Ok((n, src)) = socket.recv_from(&mut buf).await else {
                break;
            };
            if let Some(reply) = mib.answer(&buf[..n]) {
                let _ = socket.send_to(&reply, src).await;
            }
        }
    });
    Target::new("127.0.0.1", port)
}

fn client(version: SnmpVersion, max_walk_rows: usize) -> Snmp2Client {
    Snmp2Client::new(&SnmpConfig {
        community: "public".to_string(),
        version,
        timeout_ms: 500,
        max_walk_rows,
    })
}

fn if_table() -> Mib {
    Mib::default()
        .with(oid::SYS_DESCR, AgentValue::Octets(b"Linux edge".to_vec()))
        .with(&oid::instance(oid::IF_INDEX, 1), AgentValue::Int(1))
        .with(&oid::instance(oid::IF_INDEX, 2), AgentValue::Int(2))
        .with(&oid::instance(oid::IF_INDEX, 3), AgentValue::Int(3))
        .with("1.3.6.1.2.1.2.2.1.2.1", AgentValue::Octets(b"lo".to_vec()))
        .with(&oid::instance(oid::IF_IN_OCTETS, 2), AgentValue::Counter32(1234))
}

// ---- tests ----

#[tokio::test]
async fn walk_stops_at_the_sibling_column() {
    let target = start_agent(if_table()).await;
    let rows = client(SnmpVersion::V2c, 4096)
        .table_walk(&target, oid::IF_INDEX)
        .await
        .unwrap();
    let indices: Vec<&str> = rows.iter().map(|r| r.index.as_str()).collect();
    assert_eq!(indices, ["1", "2", "3"]);
    assert_eq!(rows[2].value, SnmpValue::Integer(3));
}

#[tokio::test]
async fn v1_no_such_name_ends_the_walk() {
    let mib = Mib::default()
        .with(&oid::instance(oid::IF_INDEX, 1), AgentValue::Int(1))
        .with(&oid::instance(oid::IF_INDEX, 2), AgentValue::Int(2));
    let target = start_agent(mib).await;
    let rows = client(SnmpVersion::V1, 4096)
        .table_walk(&target, oid::IF_INDEX)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn v2c_end_of_mib_view_ends_the_walk() {
    let mib = Mib::default().with(&oid::instance(oid::IF_INDEX, 1), AgentValue::Int(1));
    let target = start_agent(mib).await;
    let rows = client(SnmpVersion::V2c, 4096)
        .table_walk(&target, oid::IF_INDEX)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn error_mid_walk_fails_the_whole_walk() {
    let mib = if_table().failing_at(&oid::instance(oid::IF_INDEX, 2));
    let target = start_agent(mib).await;
    let err = client(SnmpVersion::V1, 4096)
        .table_walk(&target, oid::IF_INDEX)
        .await
        .unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Protocol);
    assert!(err.detail.contains("error status 5"), "{}", err.detail);
}

#[tokio::test]
async fn walk_longer_than_the_row_cap_fails() {
    let target = start_agent(if_table()).await;
    let err = client(SnmpVersion::V2c, 2)
        .table_walk(&target, oid::IF_INDEX)
        .await
        .unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Protocol);
}

#[tokio::test]
async fn get_returns_typed_values() {
    let target = start_agent(if_table()).await;
    let c = client(SnmpVersion::V1, 4096);
    let descr = c.scalar_get(&target, oid::SYS_DESCR).await.unwrap();
    assert_eq!(descr, SnmpValue::Text("Linux edge".into()));
    let rx = c
        .scalar_get(&target, &oid::instance(oid::IF_IN_OCTETS, 2))
        .await
        .unwrap();
    assert_eq!(rx.as_u64(), Some(1234));
}

#[tokio::test]
async fn get_error_status_is_a_protocol_error() {
    let target = start_agent(if_table()).await;
    let err = client(SnmpVersion::V1, 4096)
        .scalar_get(&target, oid::SYS_LOCATION)
        .await
        .unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Protocol);
}

#[tokio::test]
async fn silent_agent_is_unreachable() {
    // Bound but never read: requests go nowhere.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = Target::new("127.0.0.1", silent.local_addr().unwrap().port());
    let c = client(SnmpVersion::V1, 4096);

    let err = c.scalar_get(&target, oid::SYS_NAME).await.unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Unreachable);
    let err = c.table_walk(&target, oid::IF_INDEX).await.unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Unreachable);
}

#[tokio::test]
async fn printable_physical_address_is_rendered_as_hex() {
    let mac = vec![0x70, 0x4d, 0x7b, 0x61, 0x62, 0x63];
    let mib = Mib::default().with(&oid::instance(oid::IF_PHYS_ADDRESS, 2), AgentValue::Octets(mac));
    let target = start_agent(mib).await;
    let value = client(SnmpVersion::V1, 4096)
        .scalar_get(&target, &oid::instance(oid::IF_PHYS_ADDRESS, 2))
        .await
        .unwrap();
    assert_eq!(value.to_string(), "70:4D:7B:61:62:63");
}

#[test]
fn request_futures_keep_buffers_off_the_stack() {
    let c = client(SnmpVersion::V1, 4096);
    let target = Target::new("127.0.0.1", 161);
    let get = c.scalar_get(&target, oid::SYS_NAME);
    let walk = c.table_walk(&target, oid::IF_INDEX);
    assert!(std::mem::size_of_val(&get) < 16 * 1024, "GET future is {} bytes", std::mem::size_of_val(&get));
    assert!(std::mem::size_of_val(&walk) < 16 * 1024, "walk future is {} bytes", std::mem::size_of_val(&walk));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawned_host_refresh_over_udp_completes_cycles() {
    let agent = start_agent(
        if_table().with(oid::SYS_NAME, AgentValue::Octets(b"edge".to_vec())),
    )
    .await;
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let silent_target = Target::new("127.0.0.1", silent.local_addr().unwrap().port());

    let (_dir, repo) = temp_repo().await;
    let repo = Arc::new(repo);
    let (events_tx, mut events_rx) = broadcast::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let session = HostRefresh::new(
        HostRefreshDeps {
            client: Arc::new(client(SnmpVersion::V1, 4096)),
            host_repo: repo.clone(),
        },
        vec![agent.clone(), silent_target.clone()],
        false,
        8,
    );
    let handle = worker::spawn(
        session,
        SessionConfig {
            interval: Duration::from_secs(60),
            events: events_tx,
            shutdown_rx,
        },
    );

    let event = timeout(Duration::from_secs(10), events_rx.recv())
        .await
        .expect("cycle finished")
        .unwrap();
    assert_eq!(event.session, SessionKind::HostRefresh);
    assert_eq!(event.targets_polled, 2);
    assert_eq!(event.targets_updated, 1);

    let rec = repo.find(&agent).await.unwrap().unwrap();
    assert_eq!(rec.sys_name.as_deref(), Some("edge"));
    assert_eq!(rec.sys_descr.as_deref(), Some("Linux edge"));
    assert_eq!(rec.sys_location, None);
    assert!(repo.find(&silent_target).await.unwrap().is_none());

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}
