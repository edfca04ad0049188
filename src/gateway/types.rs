//! Gateway request and failure types.

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::environment::Credential;

/// One validation call against an environment's query gateway.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub url: Url,
    pub credential: Credential,
    pub statement: String,
    pub request_id: Uuid,
}

/// Ways a validation call can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayFailure {
    /// Non-success HTTP status. `body` is empty when it could not be read.
    #[error("gateway returned {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: String,
        url: String,
    },

    /// Typed error reported inside an otherwise successful response.
    #[error("{name}: {message}")]
    Api {
        name: String,
        message: String,
        status: u16,
        url: String,
    },

    /// The request never produced a response (connect, protocol, body).
    #[error("{name}: {message}")]
    Transport { name: String, message: String },

    /// The task driving the request failed.
    #[error("probe task failed: {0}")]
    Task(String),
}

impl GatewayFailure {
    /// True when the gateway produced an HTTP response.
    pub fn responded(&self) -> bool {
        matches!(self, GatewayFailure::Status { .. } | GatewayFailure::Api { .. })
    }
}
