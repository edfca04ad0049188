//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Probe, store and monitor produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Environment id is a field on every health event
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
