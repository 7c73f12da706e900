//! Adaptive weighted balancer.
//!
//! Each worker keeps a sliding window of recent execution times. The mean
//! of that window becomes the worker's weight (see [`WeightMode`]), and the
//! weight multiplied by the worker's static capacity factor is its score.
//! Selection picks the highest score; ties go to the lowest worker id.
//!
//! A worker with no samples yet ("cold") has weight 1.0, so it competes on
//! capacity alone.
//!
//! All state lives behind one mutex, so a selection scan always sees a
//! consistent set of weights.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use simlb_core::{BalancerConfig, ConfigError, DuplicatePolicy, WeightMode, WorkerId};
use tracing::{debug, info, warn};

use crate::error::{BalancerError, BalancerResult};
use crate::registry::{Registration, WorkerRegistry};
use crate::window::SampleWindow;

/// Weight of a worker that has not reported any completion yet.
pub const COLD_WEIGHT: f64 = 1.0;

/// Runtime state for a single worker.
#[derive(Debug)]
struct WorkerState {
    window: SampleWindow,
    moving_average: Option<f64>,
    weight: f64,
    completions: u64,
    /// Sum of every reported execution time, not just the window.
    total_execution_time: f64,
    selections: u64,
}

impl WorkerState {
    fn new(window_size: usize) -> Self {
        Self {
            window: SampleWindow::new(window_size),
            moving_average: None,
            weight: COLD_WEIGHT,
            completions: 0,
            total_execution_time: 0.0,
            selections: 0,
        }
    }

    fn record(&mut self, execution_time: f64, mode: WeightMode) -> Option<f64> {
        let evicted = self.window.push(execution_time);
        self.moving_average = self.window.mean();
        self.weight = self.moving_average.map_or(COLD_WEIGHT, |avg| mode.weight(avg));
        self.completions += 1;
        self.total_execution_time += execution_time;
        evicted
    }
}

struct BalancerState {
    registry: WorkerRegistry,
    workers: BTreeMap<WorkerId, WorkerState>,
}

impl BalancerState {
    fn worker(&self, worker: WorkerId) -> BalancerResult<&WorkerState> {
        self.workers
            .get(&worker)
            .ok_or(BalancerError::UnknownWorker(worker))
    }

    /// Highest-scoring worker; the first one in id order wins ties.
    fn best(&self) -> BalancerResult<(WorkerId, f64)> {
        let mut best: Option<(WorkerId, f64)> = None;
        for (id, capacity) in self.registry.iter() {
            let weight = self.worker(id)?.weight;
            let score = weight * capacity;
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((id, score)),
            }
        }
        best.ok_or(BalancerError::NoWorkersAvailable)
    }
}

/// Selects workers by recent performance and static capacity.
///
/// Safe to share across threads (`Arc<AdaptiveWeightBalancer>`).
pub struct AdaptiveWeightBalancer {
    config: BalancerConfig,
    state: Mutex<BalancerState>,
}

impl AdaptiveWeightBalancer {
    /// Create a balancer from a validated configuration.
    pub fn new(config: BalancerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: BalancerConfig) -> Self {
        Self {
            state: Mutex::new(BalancerState {
                registry: WorkerRegistry::new(config.duplicate_policy),
                workers: BTreeMap::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Register a worker. Its history starts empty with the cold weight.
    ///
    /// Re-registering follows the configured duplicate policy; an update
    /// replaces only the capacity factor and keeps the history.
    pub fn register(
        &self,
        worker: WorkerId,
        capacity_factor: f64,
    ) -> BalancerResult<Registration> {
        let mut state = self.state.lock().expect("balancer lock");
        let registration = state.registry.register(worker, capacity_factor)?;
        if registration == Registration::Added {
            state
                .workers
                .insert(worker, WorkerState::new(self.config.window_size));
        }
        info!(%worker, capacity_factor, ?registration, "worker registered");
        Ok(registration)
    }

    /// Pick the worker with the best `weight * capacity` score.
    ///
    /// Does not mutate any state; repeated calls without an intervening
    /// completion return the same worker.
    pub fn select_worker(&self) -> BalancerResult<WorkerId> {
        let state = self.state.lock().expect("balancer lock");
        let (worker, score) = state.best()?;
        debug!(%worker, score, "worker selected");
        Ok(worker)
    }

    /// Select a worker and count the selection against it, atomically.
    pub(crate) fn assign(&self) -> BalancerResult<WorkerId> {
        let mut state = self.state.lock().expect("balancer lock");
        let (worker, score) = state.best()?;
        if let Some(ws) = state.workers.get_mut(&worker) {
            ws.selections += 1;
        }
        debug!(%worker, score, "worker assigned");
        Ok(worker)
    }

    /// Record an observed execution time for a worker and return its new
    /// weight.
    pub fn report_completion(
        &self,
        worker: WorkerId,
        execution_time: f64,
    ) -> BalancerResult<f64> {
        let mut state = self.state.lock().expect("balancer lock");
        if state.registry.is_empty() {
            return Err(BalancerError::NoWorkersAvailable);
        }
        let ws = state
            .workers
            .get_mut(&worker)
            .ok_or(BalancerError::UnknownWorker(worker))?;

        if !execution_time.is_finite() || execution_time < 0.0 {
            warn!(%worker, execution_time, "rejected invalid execution time");
            return Err(BalancerError::InvalidSample {
                worker,
                time: execution_time,
            });
        }

        let evicted = ws.record(execution_time, self.config.weight_mode);
        debug!(
            %worker,
            execution_time,
            ?evicted,
            moving_average = ?ws.moving_average,
            weight = ws.weight,
            "completion recorded"
        );
        Ok(ws.weight)
    }

    pub fn weight_of(&self, worker: WorkerId) -> BalancerResult<f64> {
        let state = self.state.lock().expect("balancer lock");
        Ok(state.worker(worker)?.weight)
    }

    /// Mean of the worker's current window, `None` while cold.
    pub fn moving_average_of(&self, worker: WorkerId) -> BalancerResult<Option<f64>> {
        let state = self.state.lock().expect("balancer lock");
        Ok(state.worker(worker)?.moving_average)
    }

    pub fn score_of(&self, worker: WorkerId) -> BalancerResult<f64> {
        let state = self.state.lock().expect("balancer lock");
        let capacity = state.registry.capacity_factor_of(worker)?;
        Ok(state.worker(worker)?.weight * capacity)
    }

    pub fn capacity_factor_of(&self, worker: WorkerId) -> BalancerResult<f64> {
        let state = self.state.lock().expect("balancer lock");
        state.registry.capacity_factor_of(worker)
    }

    /// Registered worker ids, lowest first.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        let state = self.state.lock().expect("balancer lock");
        state.registry.all_worker_ids().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("balancer lock").registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().expect("balancer lock").registry.is_empty()
    }

    /// Point-in-time statistics for every worker, lowest id first.
    pub fn snapshot(&self) -> BalancerSnapshot {
        let state = self.state.lock().expect("balancer lock");
        let workers = state
            .registry
            .iter()
            .filter_map(|(id, capacity)| {
                let ws = state.workers.get(&id)?;
                Some(WorkerSnapshot {
                    worker: id,
                    capacity_factor: capacity,
                    samples: ws.window.samples().collect(),
                    cold: ws.window.is_empty(),
                    moving_average: ws.moving_average,
                    weight: ws.weight,
                    score: ws.weight * capacity,
                    completions: ws.completions,
                    total_execution_time: ws.total_execution_time,
                    selections: ws.selections,
                })
            })
            .collect();

        BalancerSnapshot {
            weight_mode: self.config.weight_mode,
            window_size: self.config.window_size,
            duplicate_policy: state.registry.duplicate_policy(),
            workers,
        }
    }
}

impl Default for AdaptiveWeightBalancer {
    fn default() -> Self {
        Self::from_valid_config(BalancerConfig::default())
    }
}

/// Statistics for one worker at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSnapshot {
    pub worker: WorkerId,
    pub capacity_factor: f64,
    /// Window contents, oldest first.
    pub samples: Vec<f64>,
    /// No completion reported yet; the weight is [`COLD_WEIGHT`].
    pub cold: bool,
    pub moving_average: Option<f64>,
    pub weight: f64,
    pub score: f64,
    /// Completions reported over the worker's lifetime.
    pub completions: u64,
    /// Sum of all execution times reported over the worker's lifetime.
    pub total_execution_time: f64,
    /// Jobs assigned through a dispatcher.
    pub selections: u64,
}

impl WorkerSnapshot {
    /// Lifetime mean execution time, `None` before the first completion.
    pub fn mean_execution_time(&self) -> Option<f64> {
        (self.completions > 0).then(|| self.total_execution_time / self.completions as f64)
    }

    /// Completed jobs per unit of busy time, `None` until time has been
    /// spent.
    pub fn throughput(&self) -> Option<f64> {
        (self.total_execution_time > 0.0)
            .then(|| self.completions as f64 / self.total_execution_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancerSnapshot {
    pub weight_mode: WeightMode,
    pub window_size: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub workers: Vec<WorkerSnapshot>,
}

impl BalancerSnapshot {
    pub fn worker(&self, worker: WorkerId) -> Option<&WorkerSnapshot> {
        self.workers.iter().find(|w| w.worker == worker)
    }

    pub fn total_completions(&self) -> u64 {
        self.workers.iter().map(|w| w.completions).sum()
    }

    pub fn total_execution_time(&self) -> f64 {
        self.workers.iter().map(|w| w.total_execution_time).sum()
    }

    /// Mean execution time across all completions of all workers.
    pub fn mean_execution_time(&self) -> Option<f64> {
        let completions = self.total_completions();
        (completions > 0).then(|| self.total_execution_time() / completions as f64)
    }

    /// Completed jobs per unit of summed busy time across the pool.
    pub fn throughput(&self) -> Option<f64> {
        let total = self.total_execution_time();
        (total > 0.0).then(|| self.total_completions() as f64 / total)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
