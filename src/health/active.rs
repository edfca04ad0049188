//! Active health monitoring.
//!
//! # Responsibilities
//! - Keep one poller per enabled environment (reconciliation)
//! - Run probe cycles on a fixed interval, one at a time per environment
//! - Feed results, and late results of booting cycles, into the store
//!
//! # Design Decisions
//! - A cycle is applied before the next tick is awaited; missed ticks are
//!   delayed rather than bursted
//! - Cycle ids come from the store, in probe-start order
//! - Every poller and its late-result tasks hang off one cancellation tree

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::environment::{Credential, Environment, EnvironmentId};
use crate::gateway::QueryGateway;
use crate::health::probe::{HealthProbe, LateResolution};
use crate::health::state::EnvironmentHealthState;

struct Poller {
    environment: Environment,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls every enabled environment and keeps the store in step with the
/// environment list.
pub struct HealthMonitor<G> {
    probe: Arc<HealthProbe<G>>,
    state: Arc<EnvironmentHealthState>,
    credential: Credential,
    config: PollingConfig,
    pollers: HashMap<EnvironmentId, Poller>,
    root: CancellationToken,
}

impl<G: QueryGateway> HealthMonitor<G> {
    pub fn new(
        probe: Arc<HealthProbe<G>>,
        state: Arc<EnvironmentHealthState>,
        credential: Credential,
        config: PollingConfig,
    ) -> Self {
        Self {
            probe,
            state,
            credential,
            config,
            pollers: HashMap::new(),
            root: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> Arc<EnvironmentHealthState> {
        self.state.clone()
    }

    /// Ids of the environments currently being polled, sorted.
    pub fn polled(&self) -> Vec<EnvironmentId> {
        let mut ids: Vec<_> = self.pollers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Bring the set of pollers in line with `environments`.
    ///
    /// Enabled environments get a poller and a pending snapshot. Environments
    /// that are no longer enabled or no longer listed lose both. An
    /// environment whose descriptor changed gets a fresh poller but keeps its
    /// snapshot until the next cycle replaces it.
    pub fn reconcile(&mut self, environments: &[Environment]) {
        let desired: HashMap<&EnvironmentId, &Environment> = environments
            .iter()
            .filter(|e| e.is_enabled())
            .map(|e| (&e.id, e))
            .collect();

        let outdated: Vec<EnvironmentId> = self
            .pollers
            .iter()
            .filter(|(id, poller)| desired.get(id).map_or(true, |e| **e != poller.environment))
            .map(|(id, _)| id.clone())
            .collect();

        for id in outdated {
            if let Some(poller) = self.pollers.remove(&id) {
                poller.cancel.cancel();
            }
            if !desired.contains_key(&id) {
                tracing::info!(environment = %id, "Environment no longer enabled, stopping health checks");
                self.state.forget(&id);
            } else {
                tracing::info!(environment = %id, "Environment descriptor changed, restarting health checks");
            }
        }

        // Snapshots of environments that were never polled but are tracked
        // (e.g. left over from a stopped monitor) are dropped as well.
        for (id, _) in self.state.snapshots() {
            if !desired.contains_key(&id) {
                self.state.forget(&id);
            }
        }

        for environment in desired.values() {
            if self.pollers.contains_key(&environment.id) {
                continue;
            }
            self.state.track(&environment.id);
            self.spawn_poller((*environment).clone());
        }
    }

    fn spawn_poller(&mut self, environment: Environment) {
        let cancel = self.root.child_token();
        let id = environment.id.clone();

        tracing::info!(
            environment = %id,
            region = %environment.region,
            endpoint = %environment.query_endpoint,
            interval_ms = self.config.interval_ms,
            "Starting health checks"
        );

        let handle = tokio::spawn(poll_environment(
            self.probe.clone(),
            self.state.clone(),
            self.credential.clone(),
            environment.clone(),
            self.config.clone(),
            cancel.clone(),
        ));

        self.pollers.insert(
            id,
            Poller {
                environment,
                cancel,
                handle,
            },
        );
    }

    /// Reconcile on every environment list update until shutdown.
    pub async fn run(
        mut self,
        environments: Vec<Environment>,
        mut updates: mpsc::UnboundedReceiver<Vec<Environment>>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(
            interval_ms = self.config.interval_ms,
            late_resolution = ?self.config.late_resolution,
            "Health monitor starting"
        );
        self.reconcile(&environments);

        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(environments) => self.reconcile(&environments),
                    None => {
                        tracing::debug!("Environment updates closed, waiting for shutdown");
                        let _ = shutdown.recv().await;
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        self.stop().await;
    }

    /// Cancel every poller and in-flight late result, then wait for the pollers.
    pub async fn stop(&mut self) {
        self.root.cancel();
        for (_, poller) in self.pollers.drain() {
            let _ = poller.handle.await;
        }
        tracing::info!("Health monitor stopped");
    }
}

impl<G> Drop for HealthMonitor<G> {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn poll_environment<G: QueryGateway>(
    probe: Arc<HealthProbe<G>>,
    state: Arc<EnvironmentHealthState>,
    credential: Credential,
    environment: Environment,
    config: PollingConfig,
    cancel: CancellationToken,
) {
    let id = environment.id.clone();

    if config.jitter_ms > 0 {
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=config.jitter_ms));
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = time::sleep(jitter) => {}
        }
    }

    let mut ticker = time::interval(Duration::from_millis(config.interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(cycle) = state.begin_cycle(&id) else {
            tracing::debug!(environment = %id, "Environment untracked, stopping poller");
            break;
        };

        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            report = probe.probe(&environment, &credential) => report,
        };

        state.apply(&id, report.snapshot, cycle);

        if let Some(late) = report.pending {
            watch_late_result(&state, &id, late, cycle, &cancel);
        }
    }

    tracing::debug!(environment = %id, "Poller exited");
}

/// Hand the eventual answer of a booting cycle to the store.
///
/// The request is watched under every policy: the store decides whether the
/// answer counts, and a boot budget cancellation always does.
fn watch_late_result(
    state: &Arc<EnvironmentHealthState>,
    id: &EnvironmentId,
    late: LateResolution,
    cycle: u64,
    cancel: &CancellationToken,
) {
    let state = state.clone();
    let id = id.clone();
    let cancel = cancel.child_token();
    let request = late.token();

    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => request.cancel(),
            snapshot = late.resolve() => {
                state.apply_late(&id, snapshot, cycle);
            }
        }
    });
}
