//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Polling (active.rs):
//!     Periodic timer per environment
//!     → begin cycle in state.rs
//!     → probe.rs (one request under resilience::timeouts)
//!     → classifier.rs on failure
//!     → apply snapshot to state.rs
//!
//! State (state.rs):
//!     environment id → latest HealthSnapshot (snapshot.rs)
//!     newer cycles replace older ones wholesale
//! ```
//!
//! # Design Decisions
//! - Each cycle is an independent probe; no thresholds or hysteresis
//! - Health state is per-environment, environments never coordinate
//! - Stale results are rejected by cycle id, not by arrival time

pub mod active;
pub mod classifier;
pub mod probe;
pub mod snapshot;
pub mod state;

pub use active::HealthMonitor;
pub use classifier::ErrorClassifier;
pub use probe::{HealthProbe, LateResolution, ProbeReport, ProbeSettings};
pub use snapshot::{ErrorDetails, Health, HealthError, HealthSnapshot};
pub use state::{Applied, EnvironmentHealthState, HealthSummary};
