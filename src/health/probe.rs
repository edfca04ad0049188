//! Single-cycle connectivity probe.
//!
//! # Responsibilities
//! - Send one validation statement to an environment's query gateway
//! - Classify the outcome under the interim and terminal deadlines
//! - Hand back a still-running request when the interim deadline fires
//!
//! # Outcomes
//! ```text
//! response ok before interim        → healthy
//! failure before interim            → crashed [classified failure]
//! interim passed, budget left       → booting (request keeps running)
//! budget exhausted                  → crashed [cancellation] (request cancelled)
//! ```
//!
//! # Design Decisions
//! - Nothing escapes as an error; every path yields a snapshot
//! - Exactly one network attempt per call

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::config::ProbeConfig;
use crate::environment::{Credential, Environment, EnvironmentId};
use crate::gateway::{GatewayFailure, QueryGateway, ValidationRequest};
use crate::health::classifier::ErrorClassifier;
use crate::health::snapshot::HealthSnapshot;
use crate::observability::metrics;
use crate::resilience::timeouts::{InFlight, Settled, TimeoutPolicy};

/// Budgets and wire parameters of a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub request_timeout: Duration,
    pub max_boot_budget: Duration,
    pub statement: String,
    /// Path of the SQL endpoint, joined onto the environment's query endpoint.
    pub path: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

impl From<&ProbeConfig> for ProbeSettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            max_boot_budget: Duration::from_secs(config.max_boot_budget_secs),
            statement: config.statement.clone(),
            path: config.path.clone(),
        }
    }
}

/// Result of one probe cycle.
#[derive(Debug)]
pub struct ProbeReport {
    pub snapshot: HealthSnapshot,
    /// Present when the cycle reported booting and the request is still running.
    pub pending: Option<LateResolution>,
}

/// The request behind a booting report, still governed by the boot budget.
#[derive(Debug)]
pub struct LateResolution {
    environment: EnvironmentId,
    in_flight: InFlight<Result<(), GatewayFailure>>,
}

impl LateResolution {
    /// Wait for the request and classify it like an on-time answer.
    /// A request cancelled by the boot budget classifies as crashed.
    pub async fn resolve(self) -> HealthSnapshot {
        let snapshot = match self.in_flight.resolve().await {
            Ok(Some(Ok(()))) => HealthSnapshot::healthy(),
            Ok(Some(Err(failure))) => {
                HealthSnapshot::crashed(ErrorClassifier::from_failure(&failure), failure.responded())
            }
            Ok(None) => HealthSnapshot::crashed(ErrorClassifier::from_cancellation(), false),
            Err(e) => HealthSnapshot::crashed(
                ErrorClassifier::from_failure(&GatewayFailure::Task(e)),
                false,
            ),
        };
        tracing::debug!(
            environment = %self.environment,
            health = snapshot.health().as_str(),
            "Late probe result resolved"
        );
        snapshot
    }

    /// Token that abandons the request when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.in_flight.token()
    }
}

/// Issues connectivity checks against query gateways.
#[derive(Debug)]
pub struct HealthProbe<G> {
    gateway: G,
    settings: ProbeSettings,
}

impl<G: QueryGateway> HealthProbe<G> {
    pub fn new(gateway: G, settings: ProbeSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(self.settings.request_timeout, self.settings.max_boot_budget)
    }

    /// Probe once and return only the snapshot.
    ///
    /// A booting request is left running in the background (it is not
    /// cancelled) and its eventual result is dropped.
    pub async fn check_health(&self, environment: &Environment, credential: &Credential) -> HealthSnapshot {
        self.probe(environment, credential).await.snapshot
    }

    /// Probe once, keeping a handle on a request that outlived the interim deadline.
    pub async fn probe(&self, environment: &Environment, credential: &Credential) -> ProbeReport {
        if !environment.is_enabled() {
            tracing::warn!(
                environment = %environment.id,
                lifecycle = ?environment.lifecycle,
                "Skipping probe of environment that is not enabled"
            );
            return ProbeReport {
                snapshot: HealthSnapshot::pending(),
                pending: None,
            };
        }

        let start = Instant::now();
        let request_id = Uuid::new_v4();

        let url = gateway_url(&environment.query_endpoint, &self.settings.path);

        tracing::debug!(
            environment = %environment.id,
            request_id = %request_id,
            url = %url,
            "Probing query gateway"
        );

        let request = ValidationRequest {
            url,
            credential: credential.clone(),
            statement: self.settings.statement.clone(),
            request_id,
        };
        let operation = self.gateway.validate(request);

        let report = match self.policy().race(operation, environment.created_at).await {
            Settled::Completed(Ok(())) => ProbeReport {
                snapshot: HealthSnapshot::healthy(),
                pending: None,
            },
            Settled::Completed(Err(failure)) => {
                tracing::warn!(
                    environment = %environment.id,
                    request_id = %request_id,
                    error = %failure,
                    "Health probe failed"
                );
                crashed(&failure)
            }
            Settled::Interim(in_flight) => {
                tracing::info!(
                    environment = %environment.id,
                    request_id = %request_id,
                    timeout_ms = self.settings.request_timeout.as_millis() as u64,
                    "No answer within request timeout, environment still booting"
                );
                ProbeReport {
                    snapshot: HealthSnapshot::booting(),
                    pending: Some(LateResolution {
                        environment: environment.id.clone(),
                        in_flight,
                    }),
                }
            }
            Settled::Terminal => {
                tracing::warn!(
                    environment = %environment.id,
                    request_id = %request_id,
                    boot_budget_secs = self.settings.max_boot_budget.as_secs(),
                    "Boot budget exhausted, probe cancelled"
                );
                ProbeReport {
                    snapshot: HealthSnapshot::crashed(ErrorClassifier::from_cancellation(), false),
                    pending: None,
                }
            }
            Settled::Aborted(e) => {
                tracing::error!(environment = %environment.id, error = %e, "Probe task aborted");
                crashed(&GatewayFailure::Task(e))
            }
        };

        self.finish(environment, start, report)
    }

    fn finish(&self, environment: &Environment, start: Instant, report: ProbeReport) -> ProbeReport {
        metrics::record_probe(report.snapshot.health(), start.elapsed());
        tracing::debug!(
            environment = %environment.id,
            health = report.snapshot.health().as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Probe finished"
        );
        report
    }
}

/// Append `path` to the endpoint, keeping any base path the endpoint has.
fn gateway_url(endpoint: &Url, path: &str) -> Url {
    let mut url = endpoint.clone();
    let base = endpoint.path().trim_end_matches('/');
    url.set_path(&format!("{}/{}", base, path.trim_start_matches('/')));
    url
}

fn crashed(failure: &GatewayFailure) -> ProbeReport {
    ProbeReport {
        snapshot: HealthSnapshot::crashed(ErrorClassifier::from_failure(failure), failure.responded()),
        pending: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::LifecycleState;
    use crate::health::classifier::{CANCELLATION, UNRESPONSIVE_MESSAGE};
    use crate::health::snapshot::{Health, HealthError};
    use crate::gateway::testing::ScriptedGateway;
    use std::time::SystemTime;

    fn environment(created_at: SystemTime) -> Environment {
        Environment {
            id: EnvironmentId::from("aws/us-east-1"),
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            created_at,
            query_endpoint: Url::parse("https://gw.example.net").unwrap(),
            lifecycle: LifecycleState::Enabled,
        }
    }

    fn settings(request_timeout_ms: u64, boot_budget_ms: u64) -> ProbeSettings {
        ProbeSettings {
            request_timeout: Duration::from_millis(request_timeout_ms),
            max_boot_budget: Duration::from_millis(boot_budget_ms),
            ..ProbeSettings::default()
        }
    }

    fn credential() -> Credential {
        Credential::new("token")
    }

    fn bad_request() -> GatewayFailure {
        GatewayFailure::Status {
            status: 400,
            reason: "Bad Request".to_string(),
            body: "bad request".to_string(),
            url: "https://gw.example.net/api/sql".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_healthy() {
        let gateway = ScriptedGateway::new(1, Ok(()));
        let probe = HealthProbe::new(gateway.clone(), settings(100, 3_600_000));
        let snapshot = probe.check_health(&environment(SystemTime::now()), &credential()).await;
        assert_eq!(snapshot.health(), Health::Healthy);
        assert!(snapshot.errors().is_empty());
        assert!(snapshot.resolvable());

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.as_str(), "https://gw.example.net/api/sql");
        assert_eq!(requests[0].statement, "SELECT 1");
        assert_eq!(requests[0].credential, credential());
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoint_base_path_is_kept() {
        let gateway = ScriptedGateway::new(1, Ok(()));
        let probe = HealthProbe::new(gateway.clone(), ProbeSettings::default());
        let mut env = environment(SystemTime::now());
        env.query_endpoint = Url::parse("https://gw.example.net/regions/us-east-1").unwrap();

        probe.check_health(&env, &credential()).await;
        assert_eq!(
            gateway.requests()[0].url.as_str(),
            "https://gw.example.net/regions/us-east-1/api/sql"
        );
    }

    #[test]
    fn test_gateway_url_joins_without_doubled_slashes() {
        let endpoint = Url::parse("https://gw.example.net/regions/us-east-1/").unwrap();
        assert_eq!(
            gateway_url(&endpoint, "/api/sql").as_str(),
            "https://gw.example.net/regions/us-east-1/api/sql"
        );
        let root = Url::parse("https://gw.example.net").unwrap();
        assert_eq!(gateway_url(&root, "/api/sql").as_str(), "https://gw.example.net/api/sql");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_status_is_crashed() {
        let probe = HealthProbe::new(ScriptedGateway::new(1, Err(bad_request())), settings(100, 3_600_000));
        let snapshot = probe.check_health(&environment(SystemTime::now()), &credential()).await;
        assert_eq!(snapshot.health(), Health::Crashed);
        assert_eq!(snapshot.errors(), &[HealthError::new("bad request")]);
        assert!(snapshot.resolvable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_within_budget_is_booting() {
        let gateway = ScriptedGateway::new(10, Ok(()));
        let probe = HealthProbe::new(gateway, settings(1, 3_600_000));
        let report = probe.probe(&environment(SystemTime::now()), &credential()).await;
        assert_eq!(report.snapshot.health(), Health::Booting);
        assert!(report.snapshot.errors().is_empty());

        // The request was not cancelled and still resolves.
        let late = report.pending.expect("request should still be running");
        assert_eq!(late.resolve().await.health(), Health::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_tighter_than_timeout_is_cancelled() {
        let probe = HealthProbe::new(ScriptedGateway::new(10, Ok(())), settings(2, 1));
        let report = probe.probe(&environment(SystemTime::now()), &credential()).await;
        assert!(report.pending.is_none());

        let snapshot = report.snapshot;
        assert_eq!(snapshot.health(), Health::Crashed);
        assert_eq!(snapshot.errors().len(), 1);
        assert_eq!(snapshot.errors()[0].message, UNRESPONSIVE_MESSAGE);
        assert_eq!(snapshot.errors()[0].details.as_ref().unwrap().name, CANCELLATION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_fires_immediately() {
        let gateway = ScriptedGateway::new(10, Ok(()));
        let probe = HealthProbe::new(gateway.clone(), settings(5_000, 60_000));
        let created_at = SystemTime::now() - Duration::from_secs(600);

        let started = tokio::time::Instant::now();
        let snapshot = probe.check_health(&environment(created_at), &credential()).await;
        assert_eq!(snapshot.health(), Health::Crashed);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_probes_do_not_accumulate() {
        let gateway = ScriptedGateway::new(1, Ok(()));
        let probe = HealthProbe::new(gateway.clone(), settings(100, 3_600_000));
        let env = environment(SystemTime::now());

        let first = probe.check_health(&env, &credential()).await;
        let second = probe.check_health(&env, &credential()).await;
        assert_eq!(first, second);
        assert_eq!(second.health(), Health::Healthy);
        assert!(second.errors().is_empty());
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_resolution_hits_boot_budget() {
        let probe = HealthProbe::new(ScriptedGateway::new(500, Ok(())), settings(1, 20));
        let report = probe.probe(&environment(SystemTime::now()), &credential()).await;
        assert_eq!(report.snapshot.health(), Health::Booting);

        let late = report.pending.unwrap().resolve().await;
        assert_eq!(late.health(), Health::Crashed);
        assert_eq!(late.errors()[0].message, UNRESPONSIVE_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_environment_is_not_probed() {
        let gateway = ScriptedGateway::new(1, Ok(()));
        let probe = HealthProbe::new(gateway.clone(), settings(100, 3_600_000));
        let mut env = environment(SystemTime::now());
        env.lifecycle = LifecycleState::Enabling;

        let snapshot = probe.check_health(&env, &credential()).await;
        assert_eq!(snapshot.health(), Health::Pending);
        assert_eq!(gateway.calls(), 0);
    }
}
