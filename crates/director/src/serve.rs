// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `director serve` command implementation.
//!
//! Wires the registry, resource monitor, simulated backend and dispatcher,
//! then reads JSON-lines requests from stdin and streams job events as
//! JSON lines on stdout. Logs go to stderr.
//!
//! With the static probe, every running job's cost is committed in a
//! [`CommitLedger`] and the monitor is refreshed before each submission, so
//! requests arriving while earlier jobs run are downgraded or rejected.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use director_config::{DirectorConfig, ProbeKind};
use director_core::{Capability, DirectorError, JobId, QualityTier, ResourceProbe};
use director_dispatch::{Dispatcher, JsonLinesTransport, NotificationEmitter};
use director_router::{
    CommitLedger, ResourceMonitor, StaticProbe, TierRegistry, TierRouter, probe_from_config,
};

use crate::shutdown;
use crate::simulated::{SimulatedBackend, pump_reports};

/// Real milliseconds per nominal second of simulated job duration.
const SIMULATED_MILLIS_PER_SEC: u64 = 100;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

const RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);

/// One line of stdin.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Request {
    Cancel {
        cancel: JobId,
    },
    Submit {
        capability: String,
        tier: QualityTier,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// Runs `director serve` until stdin closes and in-flight jobs finish, or a
/// shutdown signal arrives.
pub async fn run_serve(
    config: DirectorConfig,
    config_path: Option<PathBuf>,
) -> Result<(), DirectorError> {
    init_tracing(&config.service.log_level);
    info!(name = config.service.name.as_str(), "starting director serve");

    if config.metrics.enabled {
        install_prometheus(&config.metrics.listen)?;
    }
    director_dispatch::metrics::register_metrics();

    let root = CancellationToken::new();
    let cancel = shutdown::install_signal_handler(&root);

    let registry = Arc::new(TierRegistry::from_entries(config.registry_entries()));
    info!(
        profiles = registry.len(),
        capabilities = registry.capabilities().len(),
        "tier registry loaded"
    );

    let ledger = Arc::new(CommitLedger::new());
    let (probe, static_probe) = build_probe(&config, &ledger);
    let monitor = Arc::new(ResourceMonitor::new(
        probe,
        Duration::from_millis(config.monitor.refresh_timeout_ms),
    ));
    if !monitor.refresh().await {
        warn!("no initial resource snapshot, requests fail until a refresh succeeds");
    }
    let monitor_task = monitor.spawn(
        Duration::from_secs(config.monitor.refresh_interval_secs),
        cancel.clone(),
    );

    let (report_tx, report_rx) = mpsc::unbounded_channel();
    let backend = Arc::new(SimulatedBackend::new(
        report_tx,
        SIMULATED_MILLIS_PER_SEC,
        Arc::clone(&ledger),
    ));
    let transport = Arc::new(JsonLinesTransport::new(tokio::io::stdout()));
    let dispatcher = Arc::new(Dispatcher::new(
        TierRouter::new(Arc::clone(&registry)),
        Arc::clone(&monitor),
        backend,
        NotificationEmitter::new(transport),
    ));

    let pump = tokio::spawn(pump_reports(
        Arc::clone(&dispatcher),
        report_rx,
        cancel.clone(),
    ));
    let pruner = dispatcher.spawn_pruner(
        Duration::from_secs(config.dispatch.retention_secs),
        PRUNE_INTERVAL,
        cancel.clone(),
    );

    let reload_task = config_path.as_deref().and_then(|path| {
        spawn_config_reload(
            path,
            Reloadable {
                registry: Arc::clone(&registry),
                probe: static_probe.clone(),
                monitor: Arc::clone(&monitor),
            },
            cancel.clone(),
        )
    });

    let stdin = BufReader::new(tokio::io::stdin());
    read_requests(&dispatcher, stdin, &cancel).await;
    wait_for_idle(&dispatcher, &cancel).await;

    root.cancel();
    let _ = tokio::join!(monitor_task, pump, pruner);
    if let Some(task) = reload_task {
        let _ = task.await;
    }

    let counts = dispatcher.counts();
    info!(
        succeeded = counts.succeeded,
        failed = counts.failed,
        cancelled = counts.cancelled,
        "director serve stopped"
    );
    Ok(())
}

/// Probe for `serve`, plus the static probe itself when one is configured so
/// a config reload can swap its capacities. The static probe reports the
/// ledger's units as committed.
fn build_probe(
    config: &DirectorConfig,
    ledger: &Arc<CommitLedger>,
) -> (Arc<dyn ResourceProbe>, Option<Arc<StaticProbe>>) {
    match config.monitor.probe {
        ProbeKind::Static => {
            let probe = Arc::new(StaticProbe::from_config(config).with_ledger(Arc::clone(ledger)));
            (Arc::clone(&probe) as Arc<dyn ResourceProbe>, Some(probe))
        }
        ProbeKind::HostMemory => (probe_from_config(config), None),
    }
}

/// Parse one stdin line. Blank lines yield `None`.
pub fn parse_request(line: &str) -> Option<Result<Request, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Apply requests read from `input` until EOF or cancellation.
///
/// The monitor is refreshed before each submission so routing sees the
/// capacity held by jobs submitted earlier.
pub async fn read_requests<R>(dispatcher: &Dispatcher, input: R, cancel: &CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel.cancelled() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "failed to read request");
                break;
            }
        };

        match parse_request(&line) {
            None => {}
            Some(Err(e)) => warn!(error = %e, "skipping malformed request"),
            Some(Ok(Request::Submit {
                capability,
                tier,
                payload,
            })) => {
                dispatcher.monitor().refresh().await;
                dispatcher
                    .submit(Capability::new(capability), tier, payload)
                    .await;
            }
            Some(Ok(Request::Cancel { cancel: job_id })) => {
                if let Err(e) = dispatcher.cancel(job_id).await {
                    warn!(job_id = %job_id, error = %e, "cancel request refused");
                }
            }
        }
    }
}

/// Wait until no job is queued or running, or `cancel` fires.
async fn wait_for_idle(dispatcher: &Dispatcher, cancel: &CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    loop {
        if dispatcher.counts().active() == 0 {
            return;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => return,
        }
    }
}

/// What a config reload updates.
struct Reloadable {
    registry: Arc<TierRegistry>,
    probe: Option<Arc<StaticProbe>>,
    monitor: Arc<ResourceMonitor>,
}

/// Reload the tier table and pool capacities whenever the config file
/// changes.
///
/// Watches the parent directory, since editors often replace the file
/// instead of writing in place. A config that fails to load or validate is
/// logged and the current table stays in effect.
fn spawn_config_reload(
    path: &Path,
    target: Reloadable,
    cancel: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    use notify::{RecursiveMode, Watcher};
    use notify_debouncer_mini::{DebounceEventResult, new_debouncer};

    let path = path.to_path_buf();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path.file_name()?.to_os_string();

    let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();
    let mut debouncer = match new_debouncer(RELOAD_DEBOUNCE, move |res: DebounceEventResult| {
        let _ = tx.send(res);
    }) {
        Ok(debouncer) => debouncer,
        Err(e) => {
            warn!(error = %e, "config watcher unavailable, hot reload disabled");
            return None;
        }
    };
    if let Err(e) = debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive) {
        warn!(dir = %dir.display(), error = %e, "cannot watch config directory, hot reload disabled");
        return None;
    }
    info!(path = %path.display(), "watching config for tier table changes");

    Some(tokio::spawn(async move {
        // Dropping the debouncer stops the watcher thread.
        let _debouncer = debouncer;
        loop {
            let result = tokio::select! {
                result = rx.recv() => match result {
                    Some(result) => result,
                    None => break,
                },
                _ = cancel.cancelled() => break,
            };

            match result {
                Ok(events) => {
                    let touched = events
                        .iter()
                        .any(|event| event.path.file_name() == Some(file_name.as_os_str()));
                    if touched && reload_config(&path, &target.registry, target.probe.as_deref()) {
                        target.monitor.refresh().await;
                    }
                }
                Err(e) => warn!(error = %e, "config watch error"),
            }
        }
        debug!("config watcher stopped");
    }))
}

/// Load `path`, swap the registry contents and, when given, the static
/// probe's pool capacities. Returns whether the swap happened.
pub fn reload_config(path: &Path, registry: &TierRegistry, probe: Option<&StaticProbe>) -> bool {
    match director_config::load_and_validate_path(path) {
        Ok(config) => {
            let entries = config.registry_entries();
            let count = entries.len();
            registry.replace_all(entries);
            if let Some(probe) = probe {
                probe.set_template(config.static_snapshot());
            }
            info!(profiles = count, pools = config.pools.len(), "configuration reloaded");
            true
        }
        Err(errors) => {
            for e in &errors {
                warn!(error = %e, "config reload rejected");
            }
            false
        }
    }
}

fn install_prometheus(listen: &str) -> Result<(), DirectorError> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr: std::net::SocketAddr = listen
        .parse()
        .map_err(|e| DirectorError::Config(format!("invalid metrics listen address: {e}")))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| DirectorError::Internal(format!("failed to install prometheus exporter: {e}")))?;
    info!(listen = %addr, "prometheus exporter listening");
    Ok(())
}

/// Initialize the tracing subscriber with an env filter, writing to stderr
/// so stdout carries only job events.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("director={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
