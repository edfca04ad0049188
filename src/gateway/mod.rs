//! Query gateway client.
//!
//! # Data Flow
//! ```text
//! HealthProbe
//!     → ValidationRequest (endpoint, credential, statement, request id)
//!     → QueryGateway::validate (client.rs)
//!     → Ok(()) | GatewayFailure (types.rs)
//! ```
//!
//! # Design Decisions
//! - The gateway is a trait so the probe can be driven by scripted gateways
//! - Exactly one HTTP attempt per call; no client-side timeout or retry,
//!   time budgets belong to the probe
//! - The returned future is `'static` so the probe can keep it running past
//!   the interim timeout

pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{HttpGateway, QueryGateway};
pub use types::{GatewayFailure, ValidationRequest};
