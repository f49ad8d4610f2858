//! Run config - ties a task, architecture, trainer and datasplit together

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ArchitectureConfig, ConfigKind, ConfigRecord, DataSplitConfig, TaskConfig, TrainerConfig,
};
use crate::experiment::RunStatus;
use crate::serialize::TypeFamily;

/// Configuration of one experiment run.
///
/// `started`, `stopped` and `status` are bookkeeping: they are excluded from
/// the content id and from conflict checks, so a run keeps its id across its
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub struct RunConfig {
    /// Unique run name.
    pub name: String,
    /// Repetition index for otherwise identical runs.
    #[serde(default)]
    pub repetition: u32,
    /// Iterations to train for.
    pub num_iterations: u64,
    /// Validate every this many iterations.
    pub validation_interval: u64,
    /// Task to train on.
    pub task_config: TaskConfig,
    /// Network architecture.
    pub architecture_config: ArchitectureConfig,
    /// Training procedure.
    pub trainer_config: TrainerConfig,
    /// Train/validation data.
    pub datasplit_config: DataSplitConfig,
    /// Criterion used to pick the best iteration.
    pub validation_score: String,
    /// Whether [`Self::validation_score`] is minimized.
    pub validation_score_minimize: bool,
    /// When training started.
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    /// When training stopped.
    #[serde(default)]
    pub stopped: Option<DateTime<Utc>>,
    /// Final status, set together with `stopped`.
    #[serde(default)]
    pub status: Option<RunStatus>,
}

impl TypeFamily for RunConfig {
    const FAMILY: &'static str = "RunConfig";
    const TAGS: &'static [&'static str] = &["RunConfig"];

    fn type_tag(&self) -> &'static str {
        "RunConfig"
    }
}

impl ConfigRecord for RunConfig {
    const KIND: ConfigKind = ConfigKind::Run;
    const BOOKKEEPING: &'static [&'static str] = &["started", "stopped", "status"];

    fn name(&self) -> &str {
        &self.name
    }
}

impl RunConfig {
    /// Create a builder with the required parts.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        task_config: TaskConfig,
        architecture_config: ArchitectureConfig,
        trainer_config: TrainerConfig,
        datasplit_config: DataSplitConfig,
    ) -> RunConfigBuilder {
        RunConfigBuilder::new(
            name,
            task_config,
            architecture_config,
            trainer_config,
            datasplit_config,
        )
    }
}

/// Builder for `RunConfig`.
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Create a new builder. The validation score defaults to the task's
    /// first criterion, in that criterion's direction.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        task_config: TaskConfig,
        architecture_config: ArchitectureConfig,
        trainer_config: TrainerConfig,
        datasplit_config: DataSplitConfig,
    ) -> Self {
        let (validation_score, validation_score_minimize) = task_config
            .evaluation_criteria()
            .first()
            .map_or_else(|| (String::new(), true), |c| (c.name.clone(), !c.higher_is_better));
        Self {
            config: RunConfig {
                name: name.into(),
                repetition: 0,
                num_iterations: 100_000,
                validation_interval: 1_000,
                task_config,
                architecture_config,
                trainer_config,
                datasplit_config,
                validation_score,
                validation_score_minimize,
                started: None,
                stopped: None,
                status: None,
            },
        }
    }

    /// Set the repetition index.
    #[must_use]
    pub const fn repetition(mut self, repetition: u32) -> Self {
        self.config.repetition = repetition;
        self
    }

    /// Set the number of training iterations.
    #[must_use]
    pub const fn num_iterations(mut self, num_iterations: u64) -> Self {
        self.config.num_iterations = num_iterations;
        self
    }

    /// Set the validation interval.
    #[must_use]
    pub const fn validation_interval(mut self, interval: u64) -> Self {
        self.config.validation_interval = interval;
        self
    }

    /// Set the selection criterion and its direction.
    #[must_use]
    pub fn validation_score(mut self, criterion: impl Into<String>, minimize: bool) -> Self {
        self.config.validation_score = criterion.into();
        self.config.validation_score_minimize = minimize;
        self
    }

    /// Build the `RunConfig`.
    #[must_use]
    pub fn build(self) -> RunConfig {
        self.config
    }
}
