//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::environment::LifecycleState;

/// Root configuration for the health monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Probe budgets and wire parameters.
    pub probe: ProbeConfig,

    /// Polling cadence and late-result handling.
    pub polling: PollingConfig,

    /// Where the gateway bearer token comes from.
    pub credential: CredentialConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin status API.
    pub admin: AdminConfig,

    /// Environments to monitor.
    pub environments: Vec<EnvironmentConfig>,
}

/// Probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Interim timeout in milliseconds; past it the environment reports booting.
    pub request_timeout_ms: u64,

    /// Boot window in seconds, measured from environment creation.
    pub max_boot_budget_secs: u64,

    /// Validation statement sent to the gateway.
    pub statement: String,

    /// Path of the SQL endpoint on the query gateway.
    pub path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            max_boot_budget_secs: 600,
            statement: "SELECT 1".to_string(),
            path: "/api/sql".to_string(),
        }
    }
}

/// What to do with the answer to a request whose cycle already reported booting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LateResolutionPolicy {
    /// Replace the booting snapshot of the same cycle, if no newer cycle landed.
    #[default]
    UpgradeBooting,
    /// Drop it; the next cycle probes again.
    Discard,
}

/// Polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between the starts of two cycles, in milliseconds.
    pub interval_ms: u64,

    /// Upper bound of the random delay before an environment's first cycle.
    pub jitter_ms: u64,

    /// Late result handling.
    pub late_resolution: LateResolutionPolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            jitter_ms: 500,
            late_resolution: LateResolutionPolicy::UpgradeBooting,
        }
    }
}

/// Credential source. An inline token wins over the environment variable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialConfig {
    /// Environment variable holding the bearer token.
    pub token_env: String,

    /// Inline bearer token.
    pub token: Option<String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            token_env: "ENVIRONMENT_HEALTH_TOKEN".to_string(),
            token: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin status API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// One monitored environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Unique environment identifier.
    pub id: String,

    /// Cloud provider (e.g., "aws").
    #[serde(default)]
    pub provider: String,

    /// Provider region (e.g., "us-east-1").
    #[serde(default)]
    pub region: String,

    /// Creation time in seconds since the Unix epoch.
    pub created_at: u64,

    /// Base URL of the query gateway.
    pub query_endpoint: String,

    /// Provisioning state.
    #[serde(default)]
    pub lifecycle: LifecycleState,
}
