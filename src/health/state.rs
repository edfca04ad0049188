//! Per-environment snapshot store.
//!
//! # Rules
//! ```text
//! apply(id, snapshot, cycle):      accepted iff cycle > stored cycle
//! apply_late(id, snapshot, cycle): accepted iff policy allows (discard still
//!                                  allows cancellation) and the stored
//!                                  snapshot is the booting report of `cycle`
//! ```
//!
//! # Design Decisions
//! - Cycle ids come from one store-wide counter, so they grow per environment
//!   and survive forget/track without reuse
//! - Snapshots replace each other wholesale; errors never carry over
//! - Stale results are dropped silently (logged at debug, counted)

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::LateResolutionPolicy;
use crate::environment::EnvironmentId;
use crate::health::classifier::ErrorClassifier;
use crate::health::snapshot::{Health, HealthError, HealthSnapshot};
use crate::observability::metrics;

/// What happened to a snapshot handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    /// A newer (or the same) cycle is already stored.
    Stale,
    /// The environment is not tracked.
    Untracked,
    /// Late results are switched off.
    Discarded,
}

/// Count of tracked environments per health value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub pending: usize,
    pub booting: usize,
    pub healthy: usize,
    pub crashed: usize,
}

/// Authoritative map of environment id to latest snapshot.
#[derive(Debug)]
pub struct EnvironmentHealthState {
    slots: DashMap<EnvironmentId, HealthSnapshot>,
    cycles: AtomicU64,
    late_policy: LateResolutionPolicy,
}

impl Default for EnvironmentHealthState {
    fn default() -> Self {
        Self::new(LateResolutionPolicy::default())
    }
}

impl EnvironmentHealthState {
    pub fn new(late_policy: LateResolutionPolicy) -> Self {
        Self {
            slots: DashMap::new(),
            cycles: AtomicU64::new(0),
            late_policy,
        }
    }

    pub fn late_policy(&self) -> LateResolutionPolicy {
        self.late_policy
    }

    fn next_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start tracking an environment with a pending snapshot.
    /// Returns false if it was already tracked.
    pub fn track(&self, id: &EnvironmentId) -> bool {
        let inserted = match self.slots.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(HealthSnapshot::pending().stamped(self.next_cycle()));
                true
            }
        };
        if inserted {
            tracing::info!(environment = %id, "Tracking environment health");
            metrics::record_environment_health(id.as_str(), Health::Pending);
            metrics::record_tracked_environments(self.slots.len());
        }
        inserted
    }

    /// Drop the snapshot of a disabled or deleted environment.
    pub fn forget(&self, id: &EnvironmentId) -> Option<HealthSnapshot> {
        let removed = self.slots.remove(id).map(|(_, snapshot)| snapshot);
        if removed.is_some() {
            tracing::info!(environment = %id, "Stopped tracking environment health");
            metrics::record_tracked_environments(self.slots.len());
        }
        removed
    }

    /// Allocate the id of the next probe cycle for a tracked environment.
    pub fn begin_cycle(&self, id: &EnvironmentId) -> Option<u64> {
        if self.slots.contains_key(id) {
            Some(self.next_cycle())
        } else {
            None
        }
    }

    /// Store the result of probe cycle `cycle` unless a newer one is stored.
    pub fn apply(&self, id: &EnvironmentId, snapshot: HealthSnapshot, cycle: u64) -> Applied {
        let Some(mut slot) = self.slots.get_mut(id) else {
            return Applied::Untracked;
        };

        if cycle <= slot.checked_at_cycle() {
            tracing::debug!(
                environment = %id,
                cycle,
                stored_cycle = slot.checked_at_cycle(),
                "Discarding stale probe result"
            );
            metrics::record_stale_result();
            return Applied::Stale;
        }

        let previous = slot.health();
        *slot = snapshot.stamped(cycle);
        log_transition(id, previous, &slot, "probe");
        Applied::Accepted
    }

    /// Store the late outcome of a request whose cycle reported booting.
    ///
    /// Only the booting snapshot of that same cycle may be replaced; once any
    /// newer cycle is stored the late outcome is stale. Under the discard
    /// policy only a boot budget cancellation is kept, since booting must not
    /// outlive the budget.
    pub fn apply_late(&self, id: &EnvironmentId, snapshot: HealthSnapshot, cycle: u64) -> Applied {
        let cancelled = snapshot.errors().iter().any(ErrorClassifier::is_cancellation);
        if self.late_policy == LateResolutionPolicy::Discard && !cancelled {
            tracing::debug!(environment = %id, cycle, "Late probe result discarded by policy");
            return Applied::Discarded;
        }

        let Some(mut slot) = self.slots.get_mut(id) else {
            return Applied::Untracked;
        };

        if slot.checked_at_cycle() != cycle || slot.health() != Health::Booting {
            tracing::debug!(
                environment = %id,
                cycle,
                stored_cycle = slot.checked_at_cycle(),
                stored_health = slot.health().as_str(),
                "Discarding stale late probe result"
            );
            metrics::record_stale_result();
            return Applied::Stale;
        }

        let previous = slot.health();
        *slot = snapshot.stamped(cycle);
        log_transition(id, previous, &slot, "late");
        Applied::Accepted
    }

    pub fn snapshot(&self, id: &EnvironmentId) -> Option<HealthSnapshot> {
        self.slots.get(id).map(|r| r.value().clone())
    }

    pub fn is_healthy(&self, id: &EnvironmentId) -> bool {
        self.slots.get(id).is_some_and(|r| r.is_healthy())
    }

    pub fn has_errors(&self, id: &EnvironmentId) -> bool {
        self.slots.get(id).is_some_and(|r| !r.errors().is_empty())
    }

    pub fn errors_for(&self, id: &EnvironmentId) -> Vec<HealthError> {
        self.slots
            .get(id)
            .map(|r| r.errors().to_vec())
            .unwrap_or_default()
    }

    pub fn is_tracked(&self, id: &EnvironmentId) -> bool {
        self.slots.contains_key(id)
    }

    /// All snapshots, ordered by environment id.
    pub fn snapshots(&self) -> Vec<(EnvironmentId, HealthSnapshot)> {
        let mut all: Vec<_> = self
            .slots
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn summary(&self) -> HealthSummary {
        let mut summary = HealthSummary::default();
        for r in self.slots.iter() {
            match r.health() {
                Health::Pending => summary.pending += 1,
                Health::Booting => summary.booting += 1,
                Health::Healthy => summary.healthy += 1,
                Health::Crashed => summary.crashed += 1,
            }
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn log_transition(id: &EnvironmentId, previous: Health, current: &HealthSnapshot, source: &str) {
    metrics::record_environment_health(id.as_str(), current.health());
    if previous == current.health() {
        tracing::trace!(environment = %id, cycle = current.checked_at_cycle(), "Health unchanged");
        return;
    }
    match current.health() {
        Health::Crashed => tracing::warn!(
            environment = %id,
            from = previous.as_str(),
            cycle = current.checked_at_cycle(),
            source,
            error = current.errors().first().map(|e| e.message.as_str()).unwrap_or(""),
            "Environment crashed"
        ),
        health => tracing::info!(
            environment = %id,
            from = previous.as_str(),
            to = health.as_str(),
            cycle = current.checked_at_cycle(),
            source,
            "Environment health changed"
        ),
    }
}
