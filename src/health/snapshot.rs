//! Health snapshot data model.
//!
//! A snapshot is the complete result of one probe cycle. It is never merged
//! with the previous one; each accepted cycle replaces it wholesale.

use serde::{Deserialize, Serialize};

/// Reachability classification of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Tracked but not yet probed.
    Pending,
    /// No answer yet, still inside the boot budget.
    Booting,
    Healthy,
    Crashed,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Pending => "pending",
            Health::Booting => "booting",
            Health::Healthy => "healthy",
            Health::Crashed => "crashed",
        }
    }

    /// Numeric encoding used by the status gauge.
    pub fn gauge_value(&self) -> f64 {
        match self {
            Health::Pending => 0.0,
            Health::Booting => 1.0,
            Health::Healthy => 2.0,
            Health::Crashed => 3.0,
        }
    }
}

/// Structured cause attached to a [`HealthError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A user-presentable error with an optional expandable detail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl HealthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: ErrorDetails) -> Self {
        Self {
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Latest known health of one environment.
///
/// The constructors are the only way to build a snapshot, so the
/// health/errors pairing always holds: healthy, booting and pending carry no
/// errors and crashed carries at least one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    health: Health,
    errors: Vec<HealthError>,
    resolvable: bool,
    checked_at_cycle: u64,
}

impl HealthSnapshot {
    pub fn pending() -> Self {
        Self {
            health: Health::Pending,
            errors: Vec::new(),
            resolvable: false,
            checked_at_cycle: 0,
        }
    }

    pub fn healthy() -> Self {
        Self {
            health: Health::Healthy,
            errors: Vec::new(),
            resolvable: true,
            checked_at_cycle: 0,
        }
    }

    pub fn booting() -> Self {
        Self {
            health: Health::Booting,
            errors: Vec::new(),
            resolvable: false,
            checked_at_cycle: 0,
        }
    }

    /// `resolvable` records whether the gateway answered at all.
    pub fn crashed(error: HealthError, resolvable: bool) -> Self {
        Self {
            health: Health::Crashed,
            errors: vec![error],
            resolvable,
            checked_at_cycle: 0,
        }
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn errors(&self) -> &[HealthError] {
        &self.errors
    }

    pub fn resolvable(&self) -> bool {
        self.resolvable
    }

    pub fn checked_at_cycle(&self) -> u64 {
        self.checked_at_cycle
    }

    pub fn is_healthy(&self) -> bool {
        self.health == Health::Healthy
    }

    pub(crate) fn stamped(mut self, cycle: u64) -> Self {
        self.checked_at_cycle = cycle;
        self
    }
}
