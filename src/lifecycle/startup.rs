//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize all subsystems in dependency order
//! - Start background tasks (monitor, config watcher, admin API)
//! - Wait for shutdown and for every task to drain
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The admin API starts last (snapshots exist before anyone can read them)

use arc_swap::ArcSwap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::admin::{self, AppState};
use crate::config::loader::{environments, load_config, resolve_credential, ConfigError};
use crate::config::watcher::ConfigWatcher;
use crate::config::MonitorConfig;
use crate::environment::Environment;
use crate::gateway::HttpGateway;
use crate::health::{EnvironmentHealthState, HealthMonitor, HealthProbe, ProbeSettings};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::{logging, metrics};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build gateway client: {0}")]
    Gateway(#[from] reqwest::Error),

    #[error("failed to watch configuration: {0}")]
    Watch(#[from] notify::Error),

    #[error("invalid {field} address '{value}'")]
    Address { field: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load the configuration, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<MonitorConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(MonitorConfig::default()),
    }
}

/// Run the monitor until a termination signal arrives.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), StartupError> {
    let config = load(config_path.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        environments = config.environments.len(),
        request_timeout_ms = config.probe.request_timeout_ms,
        max_boot_budget_secs = config.probe.max_boot_budget_secs,
        "environment-health starting"
    );

    if config.observability.metrics_enabled {
        let addr = parse_addr("metrics", &config.observability.metrics_address)?;
        metrics::init_metrics(addr);
    }

    let credential = resolve_credential(&config.credential)?;
    let initial = environments(&config)?;

    let state = Arc::new(EnvironmentHealthState::new(config.polling.late_resolution));
    let probe = Arc::new(HealthProbe::new(
        HttpGateway::new()?,
        ProbeSettings::from(&config.probe),
    ));
    let shared = Arc::new(ArcSwap::from_pointee(config.clone()));

    let shutdown = Shutdown::new();
    let signals = spawn_signal_handler(shutdown.clone());

    let (env_tx, env_rx) = mpsc::unbounded_channel::<Vec<Environment>>();
    let monitor = HealthMonitor::new(probe, state.clone(), credential, config.polling.clone());
    let monitor_task = tokio::spawn(monitor.run(initial, env_rx, shutdown.subscribe()));

    // The watcher stops when dropped, so it lives until the end of `run`.
    let _watcher = match &config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, config.clone());
            let watcher = watcher.run()?;
            let shared = shared.clone();
            let mut stopped = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        update = updates.recv() => {
                            let Some(new_config) = update else { break };
                            apply_reload(&shared, new_config, &env_tx);
                        }
                        _ = stopped.recv() => break,
                    }
                }
            });
            Some(watcher)
        }
        None => None,
    };

    let admin_task = if config.admin.enabled {
        let addr = parse_addr("admin", &config.admin.bind_address)?;
        let listener = TcpListener::bind(addr).await?;
        let app_state = AppState {
            health: state.clone(),
            config: shared.clone(),
        };
        Some(tokio::spawn(admin::serve(listener, app_state, shutdown.subscribe())))
    } else {
        None
    };

    if let Err(e) = monitor_task.await {
        tracing::error!(error = %e, "Health monitor task failed");
    }
    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task failed"),
            Ok(Ok(())) => {}
        }
    }
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

fn apply_reload(
    shared: &ArcSwap<MonitorConfig>,
    new_config: MonitorConfig,
    env_tx: &mpsc::UnboundedSender<Vec<Environment>>,
) {
    let envs = match environments(&new_config) {
        Ok(envs) => envs,
        Err(e) => {
            tracing::error!(error = %e, "Rejected reloaded environment list");
            return;
        }
    };

    let current = shared.load();
    if current.probe != new_config.probe || current.polling != new_config.polling {
        tracing::warn!("Probe and polling settings change only on restart");
    }

    shared.store(Arc::new(new_config));
    let _ = env_tx.send(envs);
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}
