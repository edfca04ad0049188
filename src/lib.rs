//! Environment connectivity health monitor.
//!
//! Probes the query gateway of every enabled environment on an interval and
//! keeps the latest classified snapshot (pending, booting, healthy, crashed)
//! per environment.

pub mod admin;
pub mod config;
pub mod environment;
pub mod gateway;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::MonitorConfig;
pub use environment::{Credential, Environment, EnvironmentId, LifecycleState};
pub use health::{EnvironmentHealthState, Health, HealthMonitor, HealthProbe, HealthSnapshot};
pub use lifecycle::Shutdown;
