//! Balancer error types.

use simlb_core::{JobId, WorkerId};
use thiserror::Error;

/// Errors that can occur while registering workers, selecting a worker
/// or reporting completions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BalancerError {
    #[error("invalid capacity factor for {worker}: {capacity} (must be finite and > 0)")]
    InvalidCapacity { worker: WorkerId, capacity: f64 },

    #[error("worker already registered: {0}")]
    DuplicateWorker(WorkerId),

    #[error("unknown worker: {0}")]
    UnknownWorker(WorkerId),

    #[error("invalid execution time for {worker}: {time} (must be finite and >= 0)")]
    InvalidSample { worker: WorkerId, time: f64 },

    #[error("no workers available")]
    NoWorkersAvailable,

    #[error("job not in flight: {0}")]
    UnknownJob(JobId),

    #[error("job already in flight: {0}")]
    JobAlreadyInFlight(JobId),
}

impl BalancerError {
    /// Whether the caller may retry the operation later.
    ///
    /// Only an empty pool is transient; everything else is a misuse.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BalancerError::NoWorkersAvailable)
    }
}

pub type BalancerResult<T> = Result<T, BalancerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_empty_pool_is_retryable() {
        assert!(BalancerError::NoWorkersAvailable.is_retryable());
        assert!(!BalancerError::UnknownWorker(WorkerId(1)).is_retryable());
        assert!(!BalancerError::DuplicateWorker(WorkerId(1)).is_retryable());
        assert!(!BalancerError::UnknownJob(JobId(9)).is_retryable());
        assert!(
            !BalancerError::InvalidSample {
                worker: WorkerId(1),
                time: -1.0
            }
            .is_retryable()
        );
    }

    #[test]
    fn messages_name_the_worker() {
        let err = BalancerError::InvalidCapacity {
            worker: WorkerId(4),
            capacity: 0.0,
        };
        assert!(err.to_string().contains("worker-4"));
    }
}
