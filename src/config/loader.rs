//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{CredentialConfig, MonitorConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::environment::types::{Environment, EnvironmentError};
use crate::environment::Credential;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("No credential: set credential.token or the {0} environment variable")]
    MissingCredential(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<MonitorConfig, ConfigError> {
    let config: MonitorConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Convert the configured environment list into descriptors.
pub fn environments(config: &MonitorConfig) -> Result<Vec<Environment>, ConfigError> {
    config
        .environments
        .iter()
        .map(|e| Environment::try_from(e).map_err(ConfigError::from))
        .collect()
}

/// Resolve the gateway credential.
pub fn resolve_credential(config: &CredentialConfig) -> Result<Credential, ConfigError> {
    if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(Credential::new(token));
    }
    match std::env::var(&config.token_env) {
        Ok(token) if !token.is_empty() => Ok(Credential::new(token)),
        _ => Err(ConfigError::MissingCredential(config.token_env.clone())),
    }
}
