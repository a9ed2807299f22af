//! hopgate broker
//!
//! - Config: `HOPGATE_CONFIG` (default `hopgate.yaml`), reloaded on SIGHUP
//! - Input: one JSON request report per line on stdin
//! - Output: one JSON line per parent response on stdout
//! - Logs (including state reports) on stderr, filtered by `RUST_LOG`

use std::io;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing_subscriber::{fmt, EnvFilter};

use hopgate_broker::{app_state::AppState, config, obs::ReportUpdateTrigger, parent::JsonLinesParent};
use hopgate_core::error::{HopgateError, Result};
use hopgate_core::protocol::request::decode_report;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "hopgate-broker failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("HOPGATE_CONFIG").unwrap_or_else(|_| "hopgate.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let poll_ms = cfg.broker.poll_interval_ms;

    let (report, mut report_rx) = ReportUpdateTrigger::new();
    let mut state = AppState::new(cfg, JsonLinesParent::new(io::stdout()), report)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = interval(Duration::from_millis(poll_ms));
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reload = Reload::new()
        .map_err(|e| HopgateError::Internal(format!("signal setup failed: {e}")))?;

    tracing::info!(config = %path, "hopgate-broker started");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| HopgateError::Internal(format!("read stdin failed: {e}")))?;
                let Some(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match decode_report(&line) {
                    Ok(batch) => state.dispatcher_mut().submit_requests(batch),
                    Err(e) => tracing::warn!(error = %e, "dropping request report"),
                }
            }
            _ = poll.tick() => {
                state.dispatcher_mut().poll_children();
            }
            changed = report_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.dispatcher().state_report();
                tracing::info!(report = %snapshot.to_json(), "state report");
            }
            () = reload.recv() => {
                match config::load_from_file(&path).and_then(|cfg| state.reload(cfg)) {
                    Ok(closed) => tracing::info!(closed = closed.len(), "config reloaded"),
                    Err(e) => tracing::warn!(error = %e, "config reload failed, keeping current config"),
                }
            }
        }
    }

    // Let outstanding closes complete before exiting.
    state.dispatcher_mut().poll_children();
    tracing::info!("stdin closed, hopgate-broker stopping");
    Ok(())
}

#[cfg(unix)]
struct Reload(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Reload {
    fn new() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self(signal(SignalKind::hangup())?))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct Reload;

#[cfg(not(unix))]
impl Reload {
    fn new() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}
