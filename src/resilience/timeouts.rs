//! Dual-deadline timeout enforcement.
//!
//! # Responsibilities
//! - Race an operation against an interim and a terminal deadline
//! - Keep the operation alive past the interim deadline
//! - Cancel the operation when the terminal deadline passes
//!
//! # Design Decisions
//! - The operation runs on its own task; the interim timer only stops
//!   *waiting* for it
//! - The terminal deadline lives inside that task, so it still applies after
//!   the caller stopped waiting
//! - Once cancellation is asserted a value that raced it is dropped

use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Interim and terminal budgets for one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Interim deadline; reported as slowness, never cancels.
    pub request_timeout: Duration,
    /// Boot window measured from environment creation.
    pub max_boot_budget: Duration,
}

/// Which signal settled first.
#[derive(Debug)]
pub enum Settled<T> {
    /// The operation finished before either deadline.
    Completed(T),
    /// The interim deadline passed; the operation keeps running.
    Interim(InFlight<T>),
    /// The terminal deadline passed and the operation was cancelled.
    Terminal,
    /// The task driving the operation failed.
    Aborted(String),
}

/// An operation still running after the interim deadline.
#[derive(Debug)]
pub struct InFlight<T> {
    handle: JoinHandle<Option<T>>,
    cancel: CancellationToken,
}

impl<T> InFlight<T> {
    /// Wait for the operation. `None` means it was cancelled, either by the
    /// terminal deadline or by [`InFlight::cancel`].
    pub async fn resolve(self) -> Result<Option<T>, String> {
        self.handle.await.map_err(|e| e.to_string())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels the operation.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl TimeoutPolicy {
    pub fn new(request_timeout: Duration, max_boot_budget: Duration) -> Self {
        Self {
            request_timeout,
            max_boot_budget,
        }
    }

    /// Remaining boot budget: `max(0, budget - elapsed since creation)`.
    pub fn terminal_delay(&self, created_at: SystemTime) -> Duration {
        let elapsed = SystemTime::now()
            .duration_since(created_at)
            .unwrap_or_default();
        self.max_boot_budget.saturating_sub(elapsed)
    }

    /// Run `operation` under both deadlines.
    ///
    /// When the boot budget is already spent the operation is dropped
    /// without being polled and [`Settled::Terminal`] returns at once.
    pub async fn race<F, T>(&self, operation: F, created_at: SystemTime) -> Settled<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let terminal = self.terminal_delay(created_at);
        let cancel = CancellationToken::new();

        if terminal.is_zero() {
            cancel.cancel();
            return Settled::Terminal;
        }

        let deadline = Instant::now() + terminal;
        let token = cancel.clone();
        let mut handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                _ = time::sleep_until(deadline) => {
                    token.cancel();
                    None
                }
                value = operation => Some(value),
            };
            if token.is_cancelled() {
                None
            } else {
                outcome
            }
        });

        tokio::select! {
            biased;
            joined = &mut handle => match joined {
                Ok(Some(value)) => Settled::Completed(value),
                Ok(None) => Settled::Terminal,
                Err(e) => Settled::Aborted(e.to_string()),
            },
            _ = time::sleep(self.request_timeout) => Settled::Interim(InFlight { handle, cancel }),
        }
    }
}
