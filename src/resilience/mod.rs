//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Probe request to gateway:
//!     → timeouts.rs (interim deadline reports slowness,
//!                    terminal deadline cancels)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - No retries: one attempt per probe cycle, the polling interval is the retry

pub mod timeouts;

pub use timeouts::{InFlight, Settled, TimeoutPolicy};
