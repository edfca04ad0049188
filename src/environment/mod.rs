//! Environment descriptors.
//!
//! Environments are provisioned elsewhere; this subsystem only reads them.
//! Descriptors arrive through the configuration file and are converted into
//! [`Environment`] values before they reach the monitor.

pub mod types;

pub use types::{Credential, Environment, EnvironmentId, LifecycleState};
