//! Failure classification.
//!
//! # Responsibilities
//! - Map every gateway failure to a presentable [`HealthError`]
//! - Produce the cancellation error used when the boot budget runs out
//!
//! # Design Decisions
//! - A readable gateway body is shown verbatim, with no detail record
//! - Transport faults keep their name and message for the detail view
//! - Anything carrying a status code also carries the request URL

use crate::gateway::GatewayFailure;
use crate::health::snapshot::{ErrorDetails, HealthError};

/// Message shown when the terminal timer cancelled the probe.
pub const UNRESPONSIVE_MESSAGE: &str = "Environment is unresponsive for unknown reason";

/// Detail name identifying a cancellation cause.
pub const CANCELLATION: &str = "cancellation";

const CANCELLATION_DETAIL: &str = "boot budget exhausted before the query gateway responded";

/// Stateless mapping from failure causes to [`HealthError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn from_failure(failure: &GatewayFailure) -> HealthError {
        match failure {
            GatewayFailure::Status {
                status,
                reason,
                body,
                url,
            } => {
                if !body.trim().is_empty() {
                    return HealthError::new(body.as_str());
                }
                let message = if reason.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    format!("HTTP {} {}", status, reason)
                };
                HealthError::with_details(
                    message.clone(),
                    ErrorDetails {
                        name: "ApiError".to_string(),
                        message,
                        status: Some(*status),
                        url: Some(url.clone()),
                    },
                )
            }
            GatewayFailure::Api {
                name,
                message,
                status,
                url,
            } => HealthError::with_details(
                message.clone(),
                ErrorDetails {
                    name: name.clone(),
                    message: message.clone(),
                    status: Some(*status),
                    url: Some(url.clone()),
                },
            ),
            GatewayFailure::Transport { name, message } => HealthError::with_details(
                message.clone(),
                ErrorDetails {
                    name: name.clone(),
                    message: message.clone(),
                    status: None,
                    url: None,
                },
            ),
            GatewayFailure::Task(message) => HealthError::with_details(
                message.clone(),
                ErrorDetails {
                    name: "task".to_string(),
                    message: message.clone(),
                    status: None,
                    url: None,
                },
            ),
        }
    }

    /// True for the record produced by [`ErrorClassifier::from_cancellation`].
    pub fn is_cancellation(error: &HealthError) -> bool {
        error
            .details
            .as_ref()
            .is_some_and(|details| details.name == CANCELLATION)
    }

    pub fn from_cancellation() -> HealthError {
        HealthError::with_details(
            UNRESPONSIVE_MESSAGE,
            ErrorDetails {
                name: CANCELLATION.to_string(),
                message: CANCELLATION_DETAIL.to_string(),
                status: None,
                url: None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_body_becomes_message() {
        let failure = GatewayFailure::Status {
            status: 400,
            reason: "Bad Request".to_string(),
            body: "bad request".to_string(),
            url: "https://gw.example.net/api/sql".to_string(),
        };
        assert_eq!(
            ErrorClassifier::from_failure(&failure),
            HealthError::new("bad request")
        );
    }

    #[test]
    fn test_body_is_kept_verbatim() {
        let failure = GatewayFailure::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
            body: "  stack overflow in planner\n".to_string(),
            url: "https://gw.example.net/api/sql".to_string(),
        };
        assert_eq!(
            ErrorClassifier::from_failure(&failure).message,
            "  stack overflow in planner\n"
        );
    }

    #[test]
    fn test_empty_body_is_typed_api_error() {
        let failure = GatewayFailure::Status {
            status: 503,
            reason: "Service Unavailable".to_string(),
            body: "  ".to_string(),
            url: "https://gw.example.net/api/sql".to_string(),
        };
        let error = ErrorClassifier::from_failure(&failure);
        assert_eq!(error.message, "HTTP 503 Service Unavailable");
        let details = error.details.unwrap();
        assert_eq!(details.name, "ApiError");
        assert_eq!(details.status, Some(503));
        assert_eq!(details.url.as_deref(), Some("https://gw.example.net/api/sql"));
    }

    #[test]
    fn test_transport_keeps_name_and_message() {
        let failure = GatewayFailure::Transport {
            name: "ConnectError".to_string(),
            message: "connection refused".to_string(),
        };
        let error = ErrorClassifier::from_failure(&failure);
        assert_eq!(error.message, "connection refused");
        let details = error.details.unwrap();
        assert_eq!(details.name, "ConnectError");
        assert_eq!(details.message, "connection refused");
        assert!(details.status.is_none() && details.url.is_none());
    }

    #[test]
    fn test_api_error_carries_status_and_url() {
        let failure = GatewayFailure::Api {
            name: "QueryError".to_string(),
            message: "cluster unavailable".to_string(),
            status: 200,
            url: "https://gw.example.net/api/sql".to_string(),
        };
        let details = ErrorClassifier::from_failure(&failure).details.unwrap();
        assert_eq!(details.status, Some(200));
        assert!(details.url.is_some());
    }

    #[test]
    fn test_cancellation() {
        let error = ErrorClassifier::from_cancellation();
        assert_eq!(error.message, UNRESPONSIVE_MESSAGE);
        assert!(ErrorClassifier::is_cancellation(&error));
        assert_eq!(error.details.unwrap().name, CANCELLATION);
        assert!(!ErrorClassifier::is_cancellation(&HealthError::new("bad request")));
    }
}
