//! Shared types used across simlb crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a worker (e.g. a simulated VM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

impl From<u32> for WorkerId {
    fn from(id: u32) -> Self {
        WorkerId(id)
    }
}

/// Identity of a job (a cloudlet in the simulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        JobId(id)
    }
}

/// How a worker's moving average of execution times becomes its weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    /// Weight is the reciprocal of the average execution time, so faster
    /// workers score higher.
    #[default]
    Inverse,
    /// Weight is the average execution time itself. Slow workers score
    /// higher; only useful to reproduce the legacy policy.
    Raw,
}

impl WeightMode {
    /// Smallest average execution time used as a divisor in inverse mode.
    pub const MIN_AVERAGE: f64 = 1e-9;

    /// Derive a weight from a moving average.
    pub fn weight(self, moving_average: f64) -> f64 {
        match self {
            WeightMode::Inverse => 1.0 / moving_average.max(Self::MIN_AVERAGE),
            WeightMode::Raw => moving_average,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeightMode::Inverse => "inverse",
            WeightMode::Raw => "raw",
        }
    }
}

/// What happens when a worker id is registered a second time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with a duplicate-worker error.
    #[default]
    Reject,
    /// Replace the stored capacity factor, keeping the worker's history.
    Update,
}
