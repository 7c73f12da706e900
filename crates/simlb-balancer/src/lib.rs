//! simlb-balancer — adaptive weighted worker selection for cluster simulations.
//!
//! Assigns jobs to workers (e.g. simulated VMs) by combining each worker's
//! static capacity factor with a weight derived from its recent execution
//! times. The balancer:
//!
//! - Keeps a registry of workers and their capacity factors
//! - Tracks a sliding window of execution times per worker
//! - Selects the worker with the best `weight * capacity` score
//! - Tracks in-flight jobs and feeds completion times back as weights
//!
//! # Architecture
//!
//! ```text
//! Dispatcher
//!   ├── in-flight table (job → worker)
//!   └── AdaptiveWeightBalancer (single mutex)
//!       ├── WorkerRegistry (capacity factors, ascending id order)
//!       └── Per-worker state
//!           ├── SampleWindow (FIFO, bounded)
//!           └── moving average → weight
//! ```

pub mod balancer;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod window;

pub use balancer::{AdaptiveWeightBalancer, BalancerSnapshot, COLD_WEIGHT, WorkerSnapshot};
pub use dispatch::{Assignment, Dispatcher};
pub use error::{BalancerError, BalancerResult};
pub use registry::{Registration, WorkerRegistry};
pub use simlb_core::{BalancerConfig, DuplicatePolicy, JobId, WeightMode, WorkerId};
pub use window::SampleWindow;
