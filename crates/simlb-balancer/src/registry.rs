//! Worker registry: static capacity factors keyed by worker id.
//!
//! Iteration order is ascending by id so selection scans are reproducible.
//! The registry holds no lock of its own; the balancer serializes access.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use simlb_core::{DuplicatePolicy, WorkerId};
use tracing::{debug, warn};

use crate::error::{BalancerError, BalancerResult};

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Registration {
    /// The worker was not known before.
    Added,
    /// The worker existed and its capacity factor was replaced.
    Updated { previous: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    capacities: BTreeMap<WorkerId, f64>,
    duplicate_policy: DuplicatePolicy,
}

impl WorkerRegistry {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            capacities: BTreeMap::new(),
            duplicate_policy,
        }
    }

    /// Register a worker with its capacity factor (e.g. MIPS).
    pub fn register(
        &mut self,
        worker: WorkerId,
        capacity_factor: f64,
    ) -> BalancerResult<Registration> {
        if !capacity_factor.is_finite() || capacity_factor <= 0.0 {
            warn!(%worker, capacity_factor, "rejected invalid capacity factor");
            return Err(BalancerError::InvalidCapacity {
                worker,
                capacity: capacity_factor,
            });
        }

        match self.capacities.entry(worker) {
            Entry::Vacant(slot) => {
                slot.insert(capacity_factor);
                Ok(Registration::Added)
            }
            Entry::Occupied(_) if self.duplicate_policy == DuplicatePolicy::Reject => {
                warn!(%worker, "rejected duplicate registration");
                Err(BalancerError::DuplicateWorker(worker))
            }
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(capacity_factor);
                debug!(%worker, previous, capacity_factor, "capacity factor updated");
                Ok(Registration::Updated { previous })
            }
        }
    }

    pub fn capacity_factor_of(&self, worker: WorkerId) -> BalancerResult<f64> {
        self.capacities
            .get(&worker)
            .copied()
            .ok_or(BalancerError::UnknownWorker(worker))
    }

    /// All registered ids, lowest first.
    pub fn all_worker_ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.capacities.keys().copied()
    }

    /// Registered workers with their capacity factors, lowest id first.
    pub fn iter(&self) -> impl Iterator<Item = (WorkerId, f64)> + '_ {
        self.capacities.iter().map(|(id, cap)| (*id, *cap))
    }

    pub fn contains(&self, worker: WorkerId) -> bool {
        self.capacities.contains_key(&worker)
    }

    pub fn len(&self) -> usize {
        self.capacities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacities.is_empty()
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }
}
