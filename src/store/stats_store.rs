//! Append-only store for training stats and validation scores.
//!
//! One document per (run, iteration):
//!
//! ```text
//! stats/training/<run>/<iteration>     -> {"run", "iteration", "loss", "time"}
//! stats/validation/<run>/<iteration>   -> {"run", "iteration", "parameter_scores"}
//! stats/validation_axes/<run>          -> datasets, parameter sets, criteria
//! ```
//!
//! Iterations are zero-padded so key order is iteration order. Pushes are
//! not atomic: if one fails, push the whole series again.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::reconcile::{plan, ReconcilePlan, ReconcilePolicy};
use crate::configs::PostProcessorParameters;
use crate::experiment::{
    ParameterScores, TrainingIterationStats, TrainingStats, ValidationAxes,
    ValidationIterationScores, ValidationScores,
};
use crate::kv::{key_segment, KvStore};
use crate::serialize::{content_id, unstructure};
use crate::{Error, Result};

const TRAINING: &str = "training_stats";
const VALIDATION: &str = "validation_scores";

#[derive(Debug, Serialize, Deserialize)]
struct TrainingStatDocument {
    run: String,
    iteration: u64,
    #[serde(with = "crate::serialize::float")]
    loss: f64,
    #[serde(with = "crate::serialize::float")]
    time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ParameterScoreDocument {
    dataset: String,
    post_processing_parameters: PostProcessorParameters,
    #[serde(with = "crate::serialize::float::vec")]
    scores: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ValidationScoreDocument {
    run: String,
    iteration: u64,
    parameter_scores: BTreeMap<String, ParameterScoreDocument>,
}

impl ValidationScoreDocument {
    /// Entries are keyed `<dataset>:<content id of the parameter set>`, so
    /// parameter sets sharing an `id` field keep separate entries.
    fn new(run: &str, scores: &ValidationIterationScores) -> Result<Self> {
        let mut parameter_scores = BTreeMap::new();
        for entry in scores.parameter_scores() {
            let parameters_id = content_id(&unstructure(entry.parameters())?, &[])?;
            let key = format!("{}:{parameters_id}", entry.dataset());
            let doc = ParameterScoreDocument {
                dataset: entry.dataset().to_string(),
                post_processing_parameters: entry.parameters().clone(),
                scores: entry.scores().to_vec(),
            };
            if parameter_scores.insert(key, doc).is_some() {
                return Err(Error::InvalidInput(format!(
                    "iteration {} scores dataset '{}' with {} twice",
                    scores.iteration(),
                    entry.dataset(),
                    entry.parameters().label()
                )));
            }
        }
        Ok(Self {
            run: run.to_string(),
            iteration: scores.iteration(),
            parameter_scores,
        })
    }

    /// Restore axes order; entries unknown to the axes go last, in key order.
    fn into_scores(self, axes: &ValidationAxes) -> ValidationIterationScores {
        let mut entries: Vec<ParameterScoreDocument> = self.parameter_scores.into_values().collect();
        entries.sort_by_key(|e| {
            (
                axes.dataset_position(&e.dataset).unwrap_or(usize::MAX),
                axes.parameter_position(&e.post_processing_parameters)
                    .unwrap_or(usize::MAX),
            )
        });
        let entries = entries
            .into_iter()
            .map(|e| ParameterScores::new(e.dataset, e.post_processing_parameters, e.scores))
            .collect();
        ValidationIterationScores::from_entries(self.iteration, entries)
    }
}

/// Store for the two progress series of every run.
///
/// Callers must serialize pushes per run (one writer per run).
#[derive(Clone)]
pub struct StatsStore {
    backend: Arc<dyn KvStore>,
    policy: ReconcilePolicy,
}

impl std::fmt::Debug for StatsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsStore")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl StatsStore {
    /// Create a store on top of a backend with the default policy.
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            backend,
            policy: ReconcilePolicy::default(),
        }
    }

    /// Set the policy applied when the local series is not ahead.
    #[must_use]
    pub const fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the reconcile policy.
    #[must_use]
    pub const fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Reconcile the stored training stats of `run` with `stats`.
    ///
    /// # Errors
    ///
    /// - [`Error::StaleLocalSeries`] under [`ReconcilePolicy::RejectRollback`]
    /// - [`Error::WriteContention`] if another writer stored an iteration first
    /// - backend failures (the stored series may then be truncated; push again)
    pub fn push_training_stats(&self, run: &str, stats: &TrainingStats) -> Result<()> {
        let prefix = series_prefix("training", run);
        let remote = self.frontier(&prefix)?;
        let Some(from) = self.prepare(run, TRAINING, &prefix, stats.trained_until(), remote)? else {
            return Ok(());
        };

        let records = stats.since(from);
        for record in records {
            let doc = TrainingStatDocument {
                run: run.to_string(),
                iteration: record.iteration(),
                loss: record.loss(),
                time: record.time(),
            };
            self.insert(&iteration_key(&prefix, record.iteration()), &doc)?;
        }
        debug!(run, from, written = records.len(), "pushed training stats");
        Ok(())
    }

    /// Read the stored training stats of `run`.
    ///
    /// # Errors
    ///
    /// Backend or decoding failures.
    pub fn pull_training_stats(&self, run: &str) -> Result<TrainingStats> {
        self.read_training_stats(run, None)
    }

    /// Read the stored training stats of `run` below `iteration`.
    ///
    /// # Errors
    ///
    /// Backend or decoding failures.
    pub fn pull_training_stats_until(&self, run: &str, iteration: u64) -> Result<TrainingStats> {
        self.read_training_stats(run, Some(iteration))
    }

    /// Reconcile the stored validation scores of `run` with `scores`.
    ///
    /// The series' axes are stored alongside on every push.
    ///
    /// # Errors
    ///
    /// As [`Self::push_training_stats`], plus [`Error::InvalidInput`] (before
    /// anything is written) if the axes repeat an entry or a record scores a
    /// (dataset, parameter set) pair twice.
    pub fn push_validation_scores(&self, run: &str, scores: &ValidationScores) -> Result<()> {
        scores.axes().validate()?;
        for record in scores.iteration_scores() {
            record.validate()?;
        }

        let prefix = series_prefix("validation", run);
        let remote = self.frontier(&prefix)?;
        let Some(from) =
            self.prepare(run, VALIDATION, &prefix, scores.validated_until(), remote)?
        else {
            return Ok(());
        };

        self.backend
            .set(&axes_key(run), serde_json::to_vec(scores.axes())?)?;
        let records = scores.since(from);
        for record in records {
            let doc = ValidationScoreDocument::new(run, record)?;
            self.insert(&iteration_key(&prefix, record.iteration()), &doc)?;
        }
        debug!(run, from, written = records.len(), "pushed validation scores");
        Ok(())
    }

    /// Read the stored validation scores of `run`.
    ///
    /// A run without stored scores yields an empty series with empty axes.
    ///
    /// # Errors
    ///
    /// Backend or decoding failures.
    pub fn pull_validation_scores(&self, run: &str) -> Result<ValidationScores> {
        let axes: ValidationAxes = match self.backend.get(&axes_key(run))? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => ValidationAxes::default(),
        };
        let mut scores = ValidationScores::new(axes);
        for (_, bytes) in self.backend.scan_prefix(&series_prefix("validation", run))? {
            let doc: ValidationScoreDocument = serde_json::from_slice(&bytes)?;
            let record = doc.into_scores(scores.axes());
            scores.add_iteration_scores(record)?;
        }
        Ok(scores)
    }

    fn read_training_stats(&self, run: &str, until: Option<u64>) -> Result<TrainingStats> {
        let mut stats = TrainingStats::new();
        for (_, bytes) in self.backend.scan_prefix(&series_prefix("training", run))? {
            let doc: TrainingStatDocument = serde_json::from_slice(&bytes)?;
            if until.is_some_and(|until| doc.iteration >= until) {
                break;
            }
            stats.push(TrainingIterationStats::new(doc.iteration, doc.loss, doc.time))?;
        }
        Ok(stats)
    }

    /// Stored frontier: last stored iteration + 1, or 0.
    fn frontier(&self, prefix: &str) -> Result<u64> {
        let entries = self.backend.scan_prefix(prefix)?;
        let Some((key, _)) = entries.last() else {
            return Ok(0);
        };
        key[prefix.len()..]
            .parse::<u64>()
            .map(|iteration| iteration + 1)
            .map_err(|e| Error::StorageError(format!("malformed series key '{key}': {e}")))
    }

    /// Apply the plan's destructive half. Returns the first iteration to write.
    fn prepare(
        &self,
        run: &str,
        series: &'static str,
        prefix: &str,
        local: u64,
        remote: u64,
    ) -> Result<Option<u64>> {
        match plan(local, remote) {
            ReconcilePlan::Nothing => Ok(None),
            ReconcilePlan::Append { from } => Ok(Some(from)),
            ReconcilePlan::Replace => match self.policy {
                ReconcilePolicy::RejectRollback if local == remote => Ok(None),
                ReconcilePolicy::RejectRollback => Err(Error::StaleLocalSeries {
                    run: run.to_string(),
                    series,
                    local,
                    remote,
                }),
                ReconcilePolicy::LocalWins => {
                    let deleted = self.backend.delete_prefix(prefix)?;
                    info!(run, series, local, remote, deleted, "local series behind store, replacing");
                    if self.frontier(prefix)? != 0 {
                        return Err(Error::StorageError(format!(
                            "{series} of run '{run}' still present after delete"
                        )));
                    }
                    Ok(Some(0))
                }
            },
        }
    }

    fn insert<T: Serialize>(&self, key: &str, doc: &T) -> Result<()> {
        match self.backend.put_if_absent(key, serde_json::to_vec(doc)?)? {
            None => Ok(()),
            Some(_) => Err(Error::WriteContention(key.to_string())),
        }
    }
}

fn series_prefix(series: &str, run: &str) -> String {
    format!("stats/{series}/{}/", key_segment(run))
}

fn iteration_key(prefix: &str, iteration: u64) -> String {
    format!("{prefix}{iteration:020}")
}

fn axes_key(run: &str) -> String {
    format!("stats/validation_axes/{}", key_segment(run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    fn stats(range: std::ops::Range<u64>, loss: f64) -> TrainingStats {
        let mut stats = TrainingStats::new();
        for i in range {
            stats.add_iteration(i, loss, 0.5).unwrap();
        }
        stats
    }

    #[test]
    fn test_iteration_keys_sort_numerically() {
        let prefix = series_prefix("training", "r");
        assert!(iteration_key(&prefix, 9) < iteration_key(&prefix, 10));
    }

    #[test]
    fn test_pull_until() {
        let store = StatsStore::new(Arc::new(MemoryKvStore::new()));
        store.push_training_stats("r", &stats(0..10, 1.0)).unwrap();
        let pulled = store.pull_training_stats_until("r", 4).unwrap();
        assert_eq!(pulled.trained_until(), 4);
    }

    #[test]
    fn test_run_names_do_not_collide() {
        let store = StatsStore::new(Arc::new(MemoryKvStore::new()));
        store.push_training_stats("a", &stats(0..3, 1.0)).unwrap();
        store.push_training_stats("a/b", &stats(0..5, 2.0)).unwrap();
        assert_eq!(store.pull_training_stats("a").unwrap().len(), 3);
        assert_eq!(store.pull_training_stats("a/b").unwrap().len(), 5);
    }

    #[test]
    fn test_reject_rollback_policy() {
        let store = StatsStore::new(Arc::new(MemoryKvStore::new()))
            .with_policy(ReconcilePolicy::RejectRollback);
        store.push_training_stats("r", &stats(0..8, 1.0)).unwrap();

        let err = store
            .push_training_stats("r", &stats(0..3, 2.0))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::StaleLocalSeries { local: 3, remote: 8, .. }
        ));
        // equal frontiers are a no-op
        store.push_training_stats("r", &stats(0..8, 2.0)).unwrap();
        assert_eq!(store.pull_training_stats("r").unwrap().len(), 8);
    }
}
