//! Training statistics - per-iteration loss and wall time

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Loss and time recorded for one training iteration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrainingIterationStats {
    iteration: u64,
    #[serde(with = "crate::serialize::float")]
    loss: f64,
    #[serde(with = "crate::serialize::float")]
    time: f64,
}

impl TrainingIterationStats {
    /// Create a new record.
    ///
    /// # Arguments
    ///
    /// * `iteration` - Training iteration
    /// * `loss` - Loss at that iteration (may be NaN if training diverged)
    /// * `time` - Seconds spent on the iteration
    #[must_use]
    pub const fn new(iteration: u64, loss: f64, time: f64) -> Self {
        Self {
            iteration,
            loss,
            time,
        }
    }

    /// Get the iteration.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Get the loss.
    #[must_use]
    pub const fn loss(&self) -> f64 {
        self.loss
    }

    /// Get the time spent.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }
}

/// Ordered training statistics of one run.
///
/// Iterations are unique and strictly increasing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrainingStats {
    iterations: Vec<TrainingIterationStats>,
}

impl TrainingStats {
    /// Create empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a training iteration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `iteration` does not come after the last
    /// recorded one.
    pub fn add_iteration(&mut self, iteration: u64, loss: f64, time: f64) -> Result<()> {
        self.push(TrainingIterationStats::new(iteration, loss, time))
    }

    /// Record a prepared iteration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the iteration is not strictly increasing.
    pub fn push(&mut self, stats: TrainingIterationStats) -> Result<()> {
        if let Some(last) = self.iterations.last() {
            if stats.iteration <= last.iteration {
                return Err(Error::InvalidInput(format!(
                    "training iteration {} recorded after {}",
                    stats.iteration, last.iteration
                )));
            }
        }
        self.iterations.push(stats);
        Ok(())
    }

    /// The first iteration not yet recorded: last iteration + 1, or 0.
    #[must_use]
    pub fn trained_until(&self) -> u64 {
        self.iterations.last().map_or(0, |s| s.iteration + 1)
    }

    /// All records, ordered by iteration.
    #[must_use]
    pub fn iterations(&self) -> &[TrainingIterationStats] {
        &self.iterations
    }

    /// Records at or after `iteration`.
    #[must_use]
    pub fn since(&self, iteration: u64) -> &[TrainingIterationStats] {
        let start = self.iterations.partition_point(|s| s.iteration < iteration);
        &self.iterations[start..]
    }

    /// Loss curve.
    #[must_use]
    pub fn losses(&self) -> Vec<f64> {
        self.iterations.iter().map(TrainingIterationStats::loss).collect()
    }

    /// Drop every record at or after `iteration`.
    pub fn delete_after(&mut self, iteration: u64) {
        self.iterations.retain(|s| s.iteration < iteration);
    }

    /// Number of recorded iterations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }
}
