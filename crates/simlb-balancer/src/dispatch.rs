//! Job dispatcher. Ties jobs to the workers they were sent to.
//!
//! The dispatcher asks the balancer for a worker when a job is dispatched
//! and remembers the assignment until the job completes. The observed
//! execution time is reported to the balancer only at completion, so the
//! weights reflect real measurements rather than estimates made at
//! dispatch time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use simlb_core::{JobId, WorkerId};
use tracing::{debug, warn};

use crate::balancer::AdaptiveWeightBalancer;
use crate::error::{BalancerError, BalancerResult};

/// A job placed on a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub job: JobId,
    pub worker: WorkerId,
}

pub struct Dispatcher {
    balancer: Arc<AdaptiveWeightBalancer>,
    /// In-flight jobs: job → worker.
    in_flight: Mutex<HashMap<JobId, WorkerId>>,
}

impl Dispatcher {
    pub fn new(balancer: Arc<AdaptiveWeightBalancer>) -> Self {
        Self {
            balancer,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn balancer(&self) -> &Arc<AdaptiveWeightBalancer> {
        &self.balancer
    }

    /// Assign a job to the currently best worker.
    pub fn dispatch(&self, job: JobId) -> BalancerResult<Assignment> {
        // Lock order is always in-flight table, then balancer.
        let mut in_flight = self.in_flight.lock().expect("in-flight lock");
        if in_flight.contains_key(&job) {
            return Err(BalancerError::JobAlreadyInFlight(job));
        }

        let worker = self.balancer.assign()?;
        in_flight.insert(job, worker);
        debug!(%job, %worker, "job dispatched");
        Ok(Assignment { job, worker })
    }

    /// Finish a job and feed its execution time back to the balancer.
    ///
    /// Returns the worker the job ran on. If the sample is rejected the job
    /// stays in flight so the caller can report a corrected time.
    pub fn complete(&self, job: JobId, execution_time: f64) -> BalancerResult<WorkerId> {
        let mut in_flight = self.in_flight.lock().expect("in-flight lock");
        let worker = in_flight
            .remove(&job)
            .ok_or(BalancerError::UnknownJob(job))?;

        if let Err(err) = self.balancer.report_completion(worker, execution_time) {
            warn!(%job, %worker, %err, "completion rejected, job stays in flight");
            in_flight.insert(job, worker);
            return Err(err);
        }
        debug!(%job, %worker, execution_time, "job completed");
        Ok(worker)
    }

    /// Number of jobs dispatched but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().expect("in-flight lock").len()
    }

    pub fn in_flight_on(&self, worker: WorkerId) -> usize {
        self.in_flight
            .lock()
            .expect("in-flight lock")
            .values()
            .filter(|w| **w == worker)
            .count()
    }
}
