use anyhow::{Context, Result};
use hostmon::config::{AppConfig, ReportFormat};
use hostmon::discovery::InterfaceDiscovery;
use hostmon::host_repo::HostRepo;
use hostmon::inventory::describe_device;
use hostmon::models::{CycleEvent, SessionKind};
use hostmon::snmp::Snmp2Client;
use hostmon::traffic::TrafficSeries;
use hostmon::worker::{self, HostRefresh, HostRefreshDeps, SessionConfig, TrafficSampler, TrafficSamplerDeps};
use hostmon::{report, version};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

const EVENT_CAPACITY: usize = 16;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = AppConfig::load().context("Failed to load config")?;
    tracing::info!(version = %version::banner(), snmp_version = ?app_config.snmp.version, "starting");

    let host_repo = Arc::new(
        HostRepo::connect(&app_config.database.path, app_config.database.max_pool_size)
            .await
            .with_context(|| format!("Failed to open {}", app_config.database.path))?,
    );
    host_repo.init().await?;

    let client = Arc::new(Snmp2Client::new(&app_config.snmp));
    let series = Arc::new(TrafficSeries::new(app_config.traffic.window));
    let (events_tx, events_rx) = broadcast::channel::<CycleEvent>(EVENT_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if app_config.report.describe_on_start {
        let discovery =
            InterfaceDiscovery::excluding(client.clone(), app_config.traffic.exclude_indices.clone());
        for target in app_config.host_refresh.configured_targets()? {
            let inventory = describe_device(client.as_ref(), &discovery, &target).await;
            if inventory.is_reachable() {
                print!("{}", report::render_inventory(&inventory));
            } else {
                tracing::debug!(host = %target, "no answer, skipping description");
            }
        }
    }

    let host_refresh = HostRefresh::new(
        HostRefreshDeps {
            client: client.clone(),
            host_repo: host_repo.clone(),
        },
        app_config.host_refresh.configured_targets()?,
        app_config.host_refresh.include_known_hosts,
        app_config.host_refresh.max_concurrency,
    );
    let mut handles = vec![worker::spawn(
        host_refresh,
        SessionConfig {
            interval: Duration::from_secs(app_config.host_refresh.interval_secs),
            events: events_tx.clone(),
            shutdown_rx: shutdown_rx.clone(),
        },
    )];

    let traffic_targets = app_config.traffic.configured_targets()?;
    if traffic_targets.is_empty() {
        tracing::info!("no traffic targets configured; traffic sampling disabled");
    } else {
        let sampler = TrafficSampler::new(
            TrafficSamplerDeps {
                client: client.clone(),
                discovery: InterfaceDiscovery::excluding(
                    client.clone(),
                    app_config.traffic.exclude_indices.clone(),
                ),
                series: series.clone(),
            },
            traffic_targets,
            app_config.traffic.prune_stale_interfaces,
            app_config.traffic.max_concurrency,
        );
        handles.push(worker::spawn(
            sampler,
            SessionConfig {
                interval: Duration::from_secs(app_config.traffic.interval_secs),
                events: events_tx.clone(),
                shutdown_rx: shutdown_rx.clone(),
            },
        ));
    }

    let report_handle = app_config.report.enabled.then(|| {
        tokio::spawn(render_on_events(
            events_rx,
            host_repo.clone(),
            series.clone(),
            app_config.report.format,
        ))
    });
    drop(events_tx);

    wait_for_shutdown_signal().await;
    tracing::info!("Received shutdown signal; waiting for in-flight cycles");
    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }
    if let Some(handle) = report_handle {
        let _ = handle.await;
    }
    tracing::info!("Goodbye!");
    Ok(())
}

/// Redraws the console after every completed cycle until all sessions have stopped.
async fn render_on_events(
    mut rx: broadcast::Receiver<CycleEvent>,
    host_repo: Arc<HostRepo>,
    series: Arc<TrafficSeries>,
    format: ReportFormat,
) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("report lagged, skipped {} cycle events", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let rendered = match (event.session, format) {
            (SessionKind::HostRefresh, ReportFormat::Table) => match host_repo.list().await {
                Ok(hosts) => report::render_hosts_table(&hosts),
                Err(e) => {
                    tracing::warn!(error = %e, operation = "list", "could not read registry");
                    continue;
                }
            },
            (SessionKind::HostRefresh, ReportFormat::Json) => match host_repo.list().await {
                Ok(hosts) => match report::hosts_json(&hosts) {
                    Ok(json) => json + "\n",
                    Err(e) => {
                        tracing::warn!(error = %e, "could not encode hosts");
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, operation = "list", "could not read registry");
                    continue;
                }
            },
            (SessionKind::TrafficSampling, ReportFormat::Table) => report::render_traffic(&series),
            (SessionKind::TrafficSampling, ReportFormat::Json) => match report::traffic_json(&series) {
                Ok(json) => json + "\n",
                Err(e) => {
                    tracing::warn!(error = %e, "could not encode traffic");
                    continue;
                }
            },
        };
        print!("{}", rendered);
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
