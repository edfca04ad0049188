//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MonitorConfig (validated, immutable)
//!     → shared via ArcSwap to the admin API, environments sent to the monitor
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<MonitorConfig>
//!     → monitor reconciles the environment list
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Probe budgets are read at startup; reloads only change the environment list

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    AdminConfig, CredentialConfig, EnvironmentConfig, LateResolutionPolicy, LogFormat,
    MonitorConfig, ObservabilityConfig, PollingConfig, ProbeConfig,
};
