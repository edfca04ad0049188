//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate environment ids and malformed endpoints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::MonitorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("probe.path must start with '/', got '{0}'")]
    RelativePath(String),

    #[error("{field} is not a socket address: '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("duplicate environment id '{0}'")]
    DuplicateEnvironment(String),

    #[error("environment '{id}': query_endpoint '{endpoint}' is not an http(s) URL")]
    InvalidEndpoint { id: String, endpoint: String },
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.probe.request_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "probe.request_timeout_ms" });
    }
    if config.probe.max_boot_budget_secs == 0 {
        errors.push(ValidationError::Zero { field: "probe.max_boot_budget_secs" });
    }
    if config.probe.statement.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "probe.statement" });
    }
    if !config.probe.path.starts_with('/') {
        errors.push(ValidationError::RelativePath(config.probe.path.clone()));
    }
    if config.polling.interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "polling.interval_ms" });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key" });
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for env in &config.environments {
        if env.id.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "environments.id" });
        } else if !seen.insert(env.id.as_str()) {
            errors.push(ValidationError::DuplicateEnvironment(env.id.clone()));
        }

        let valid_endpoint = Url::parse(&env.query_endpoint)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid_endpoint {
            errors.push(ValidationError::InvalidEndpoint {
                id: env.id.clone(),
                endpoint: env.query_endpoint.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EnvironmentConfig;
    use crate::environment::LifecycleState;

    fn env(id: &str, endpoint: &str) -> EnvironmentConfig {
        EnvironmentConfig {
            id: id.to_string(),
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            created_at: 0,
            query_endpoint: endpoint.to_string(),
            lifecycle: LifecycleState::Enabled,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MonitorConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_and_bad_endpoints() {
        let mut config = MonitorConfig::default();
        config.environments = vec![
            env("a", "https://gw.example.net"),
            env("a", "ftp://gw.example.net"),
            env("", "https://gw.example.net"),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateEnvironment("a".to_string())));
        assert!(errors.contains(&ValidationError::InvalidEndpoint {
            id: "a".to_string(),
            endpoint: "ftp://gw.example.net".to_string(),
        }));
        assert!(errors.contains(&ValidationError::Empty { field: "environments.id" }));
    }

    #[test]
    fn test_admin_requires_key_and_address() {
        let mut config = MonitorConfig::default();
        config.admin.enabled = true;
        config.admin.bind_address = "localhost".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_probe_path_must_be_absolute() {
        let mut config = MonitorConfig::default();
        config.probe.path = "api/sql".to_string();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::RelativePath("api/sql".to_string())]
        );
    }
}
