//! Environment and credential types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;

pub use crate::config::schema::EnvironmentConfig;

/// Identifier of a hosted environment (unique per console).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(pub String);

impl EnvironmentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvironmentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EnvironmentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Provisioning state of an environment as reported by the region API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Disabled,
    Enabling,
    Enabled,
    Deleted,
}

/// A region-bound hosted deployment. Read-only to the health subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub id: EnvironmentId,
    pub provider: String,
    pub region: String,
    pub created_at: SystemTime,
    /// Base URL of the environment's query gateway.
    pub query_endpoint: Url,
    pub lifecycle: LifecycleState,
}

impl Environment {
    pub fn is_enabled(&self) -> bool {
        self.lifecycle == LifecycleState::Enabled
    }
}

/// Errors converting an environment descriptor.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("environment '{id}': invalid query endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        id: String,
        endpoint: String,
        reason: String,
    },
}

impl TryFrom<&EnvironmentConfig> for Environment {
    type Error = EnvironmentError;

    fn try_from(config: &EnvironmentConfig) -> Result<Self, Self::Error> {
        let query_endpoint = Url::parse(&config.query_endpoint).map_err(|e| {
            EnvironmentError::InvalidEndpoint {
                id: config.id.clone(),
                endpoint: config.query_endpoint.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            id: EnvironmentId(config.id.clone()),
            provider: config.provider.clone(),
            region: config.region.clone(),
            created_at: UNIX_EPOCH + Duration::from_secs(config.created_at),
            query_endpoint,
            lifecycle: config.lifecycle,
        })
    }
}

/// Opaque bearer token. Never inspected and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
