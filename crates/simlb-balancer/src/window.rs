//! Fixed-capacity sliding window of execution-time samples.

use std::collections::VecDeque;

/// The most recent `capacity` samples, oldest first.
///
/// Pushing into a full window evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SampleWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted one if the window was full.
    pub fn push(&mut self, sample: f64) -> Option<f64> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Arithmetic mean of the current contents, `None` when empty.
    ///
    /// Recomputed from the samples on every call; no running sum is kept.
    /// If the plain sum overflows, each sample is scaled down before adding.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let n = self.samples.len() as f64;
        let sum: f64 = self.samples.iter().sum();
        if sum.is_finite() {
            return Some(sum / n);
        }
        Some(self.samples.iter().map(|s| s / n).sum())
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
