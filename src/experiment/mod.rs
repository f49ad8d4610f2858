//! Runs and their progress series
//!
//! ```text
//! Run ──┬── RunConfig            (config store)
//!       ├── TrainingStats        (stats store, one document per iteration)
//!       └── ValidationScores     (stats store, one document per iteration)
//!             └── ValidationAxes: datasets × parameter sets × criteria
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_runstore::experiment::TrainingStats;
//!
//! let mut stats = TrainingStats::new();
//! stats.add_iteration(0, 0.9, 1.5)?;
//! stats.add_iteration(1, 0.7, 1.4)?;
//! assert_eq!(stats.trained_until(), 2);
//! assert!(stats.add_iteration(1, 0.6, 1.4).is_err());
//! # Ok::<(), trueno_runstore::Error>(())
//! ```

mod run;
mod training_stats;
mod validation_scores;

pub use run::{Run, RunStatus};
pub use training_stats::{TrainingIterationStats, TrainingStats};
pub use validation_scores::{
    ParameterScores, ValidationAxes, ValidationIterationScores, ValidationScores,
};
