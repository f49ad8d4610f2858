//! Run - a run config with its progress series and lifecycle

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{TrainingStats, ValidationAxes, ValidationScores};
use crate::configs::{Criterion, PostProcessorParameters, RunConfig};
use crate::store::{ConfigStore, StatsStore};
use crate::validation::BestScore;
use crate::Result;

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is created but not yet started.
    Pending,
    /// Run is currently training.
    Running,
    /// Run completed successfully.
    Success,
    /// Run failed with an error.
    Failed,
    /// Run was cancelled by user or system.
    Cancelled,
}

/// One experiment run: its config plus the locally held progress.
///
/// The local series are the working copy; [`Run::sync`] reconciles them
/// with the stats store.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    config: RunConfig,
    status: RunStatus,
    training_stats: TrainingStats,
    validation_scores: ValidationScores,
}

impl Run {
    /// Create a fresh run, validated over `parameters` on every validation
    /// dataset of the run's datasplit.
    #[must_use]
    pub fn new(config: RunConfig, parameters: Vec<PostProcessorParameters>) -> Self {
        let axes = ValidationAxes::for_run(&config, parameters);
        Self {
            config,
            status: RunStatus::Pending,
            training_stats: TrainingStats::new(),
            validation_scores: ValidationScores::new(axes),
        }
    }

    /// Load a stored run and pull both of its series.
    ///
    /// The status is the stored final status if the run was completed.
    /// Otherwise never started is `Pending`, started is `Running`, and a
    /// record stopped without a status is `Success`.
    /// A run without stored validation scores gets axes with no parameter
    /// sets.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if no run has that name,
    /// or any store failure.
    pub fn resume(config_store: &ConfigStore, stats_store: &StatsStore, name: &str) -> Result<Self> {
        let config: RunConfig = config_store.retrieve(name)?;
        let training_stats = stats_store.pull_training_stats(name)?;
        let mut validation_scores = stats_store.pull_validation_scores(name)?;
        if validation_scores.axes() == &ValidationAxes::default() {
            validation_scores = ValidationScores::new(ValidationAxes::for_run(&config, Vec::new()));
        }

        let status = match (config.status, config.started, config.stopped) {
            (Some(status), _, _) => status,
            (None, None, _) => RunStatus::Pending,
            (None, Some(_), None) => RunStatus::Running,
            (None, Some(_), Some(_)) => RunStatus::Success,
        };
        info!(
            run = name,
            trained_until = training_stats.trained_until(),
            validated_until = validation_scores.validated_until(),
            "resumed run"
        );
        Ok(Self {
            config,
            status,
            training_stats,
            validation_scores,
        })
    }

    /// Store the config (and the configs it embeds) and push both series.
    ///
    /// Returns the run config's content id.
    ///
    /// # Errors
    ///
    /// Any config or stats store failure. Pushes are not atomic; call again
    /// after a failure.
    pub fn sync(&self, config_store: &ConfigStore, stats_store: &StatsStore) -> Result<String> {
        let id = config_store.store_run_config(&self.config)?;
        stats_store.push_training_stats(self.name(), &self.training_stats)?;
        stats_store.push_validation_scores(self.name(), &self.validation_scores)?;
        Ok(id)
    }

    /// Mark the run as started. A start time already set is kept.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.config.started.get_or_insert_with(Utc::now);
    }

    /// Complete the run with the given final status.
    ///
    /// The status is stored with the config on the next [`Run::sync`]. Like
    /// the timestamps, a status already in the store is kept.
    pub fn complete(&mut self, status: RunStatus) {
        self.status = status;
        self.config.stopped = Some(Utc::now());
        self.config.status = Some(status);
    }

    /// Best validation result under the run's selection policy.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the selection criterion
    /// is not among the validated criteria.
    pub fn best_validation(&self) -> Result<Option<BestScore>> {
        let criterion = Criterion {
            name: self.config.validation_score.clone(),
            higher_is_better: !self.config.validation_score_minimize,
        };
        self.validation_scores.best(&criterion)
    }

    /// Get the run name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the config.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Get the status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the training stats.
    #[must_use]
    pub const fn training_stats(&self) -> &TrainingStats {
        &self.training_stats
    }

    /// Get the training stats for recording.
    pub fn training_stats_mut(&mut self) -> &mut TrainingStats {
        &mut self.training_stats
    }

    /// Get the validation scores.
    #[must_use]
    pub const fn validation_scores(&self) -> &ValidationScores {
        &self.validation_scores
    }

    /// Get the validation scores for recording.
    pub fn validation_scores_mut(&mut self) -> &mut ValidationScores {
        &mut self.validation_scores
    }
}
