//! HTTP client for the environment query gateway.
//!
//! # Responsibilities
//! - POST the validation statement to the SQL endpoint
//! - Translate HTTP statuses, error results and transport errors into
//!   [`GatewayFailure`]

use futures_util::future::BoxFuture;
use reqwest::header::AUTHORIZATION;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::gateway::types::{GatewayFailure, ValidationRequest};

/// Something that can run a validation statement against a gateway.
pub trait QueryGateway: Send + Sync + 'static {
    fn validate(&self, request: ValidationRequest) -> BoxFuture<'static, Result<(), GatewayFailure>>;
}

impl<G: QueryGateway + ?Sized> QueryGateway for Arc<G> {
    fn validate(&self, request: ValidationRequest) -> BoxFuture<'static, Result<(), GatewayFailure>> {
        (**self).validate(request)
    }
}

/// `reqwest`-backed gateway client.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
}

impl HttpGateway {
    /// Build a client with the health-check user agent.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("environment-health/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl QueryGateway for HttpGateway {
    fn validate(&self, request: ValidationRequest) -> BoxFuture<'static, Result<(), GatewayFailure>> {
        let client = self.client.clone();
        Box::pin(async move {
            let url = request.url.to_string();

            let response = client
                .post(request.url)
                .header(AUTHORIZATION, request.credential.bearer())
                .header("x-request-id", request.request_id.to_string())
                .json(&serde_json::json!({ "query": request.statement }))
                .send()
                .await
                .map_err(|e| transport_failure(&e))?;

            let status = response.status();
            let body = response.text().await;

            if !status.is_success() {
                return Err(GatewayFailure::Status {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                    body: body.unwrap_or_default(),
                    url,
                });
            }

            let body = body.map_err(|e| transport_failure(&e))?;
            check_results(&body, status.as_u16(), &url)
        })
    }
}

/// Look for an error result in a successful SQL response.
///
/// The gateway answers `{"results": [...]}`; a failed statement is reported
/// as a result object carrying `error`. Bodies that are not JSON count as
/// success since the status already said so.
pub(crate) fn check_results(body: &str, status: u16, url: &str) -> Result<(), GatewayFailure> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Ok(());
    };

    let Some(results) = value.get("results").and_then(|r| r.as_array()) else {
        return Ok(());
    };

    for result in results {
        let Some(error) = result.get("error") else {
            continue;
        };
        let message = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        };
        return Err(GatewayFailure::Api {
            name: "QueryError".to_string(),
            message,
            status,
            url: url.to_string(),
        });
    }

    Ok(())
}

fn transport_failure(error: &reqwest::Error) -> GatewayFailure {
    let name = if error.is_connect() {
        "ConnectError"
    } else if error.is_timeout() {
        "TimeoutError"
    } else if error.is_body() {
        "BodyError"
    } else if error.is_decode() {
        "DecodeError"
    } else if error.is_request() {
        "RequestError"
    } else {
        "TransportError"
    };

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    GatewayFailure::Transport {
        name: name.to_string(),
        message,
    }
}
