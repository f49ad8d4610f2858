//! Validation scores - per-iteration scores for every (dataset, parameter set)

use serde::{Deserialize, Serialize};

use crate::configs::{Criterion, EvaluationScores, PostProcessorParameters, RunConfig};
use crate::{Error, Result};

/// The fixed axes a run is validated over.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationAxes {
    /// Validation dataset names.
    pub datasets: Vec<String>,
    /// Post-processor parameter sets tried on every dataset.
    pub parameters: Vec<PostProcessorParameters>,
    /// Criteria in score-vector order.
    pub criteria: Vec<Criterion>,
}

impl ValidationAxes {
    /// Create axes from their parts.
    #[must_use]
    pub fn new(
        datasets: Vec<String>,
        parameters: Vec<PostProcessorParameters>,
        criteria: Vec<Criterion>,
    ) -> Self {
        Self {
            datasets,
            parameters,
            criteria,
        }
    }

    /// Axes of a run: its validation datasets, the given parameter sets and
    /// its task's criteria.
    #[must_use]
    pub fn for_run(run: &RunConfig, parameters: Vec<PostProcessorParameters>) -> Self {
        Self::new(
            run.datasplit_config.validation_dataset_names(),
            parameters,
            run.task_config.evaluation_criteria(),
        )
    }

    /// Score-vector length a well-formed record has.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.datasets.len() * self.parameters.len() * self.criteria.len()
    }

    /// Position of a dataset name.
    #[must_use]
    pub fn dataset_position(&self, dataset: &str) -> Option<usize> {
        self.datasets.iter().position(|d| d == dataset)
    }

    /// Position of a parameter set.
    #[must_use]
    pub fn parameter_position(&self, parameters: &PostProcessorParameters) -> Option<usize> {
        self.parameters.iter().position(|p| p == parameters)
    }

    /// Look up a criterion by name.
    #[must_use]
    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    /// Check that every dataset, parameter set and criterion appears once.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] naming the first repeated entry.
    pub fn validate(&self) -> Result<()> {
        if let Some(dataset) = first_repeat(&self.datasets) {
            return Err(Error::InvalidInput(format!(
                "dataset '{dataset}' appears twice on the validation axes"
            )));
        }
        if let Some(parameters) = first_repeat(&self.parameters) {
            return Err(Error::InvalidInput(format!(
                "parameter set {} appears twice on the validation axes",
                parameters.label()
            )));
        }
        let names: Vec<&str> = self.criteria.iter().map(|c| c.name.as_str()).collect();
        if let Some(name) = first_repeat(&names) {
            return Err(Error::InvalidInput(format!(
                "criterion '{name}' appears twice on the validation axes"
            )));
        }
        Ok(())
    }
}

fn first_repeat<T: PartialEq>(items: &[T]) -> Option<&T> {
    items
        .iter()
        .enumerate()
        .find(|&(i, item)| items[..i].contains(item))
        .map(|(_, item)| item)
}

/// Per-criterion scores of one (dataset, parameter set) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterScores {
    dataset: String,
    parameters: PostProcessorParameters,
    #[serde(with = "crate::serialize::float::vec")]
    scores: Vec<f64>,
}

impl ParameterScores {
    /// Create a new entry. NaN marks an undefined score.
    #[must_use]
    pub fn new(
        dataset: impl Into<String>,
        parameters: PostProcessorParameters,
        scores: Vec<f64>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            parameters,
            scores,
        }
    }

    /// Get the dataset name.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Get the parameter set.
    #[must_use]
    pub const fn parameters(&self) -> &PostProcessorParameters {
        &self.parameters
    }

    /// Get the per-criterion scores.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }
}

/// All scores computed at one validation iteration.
///
/// Entries are kept dataset-major, then by parameter set, matching
/// [`ValidationAxes`] order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIterationScores {
    iteration: u64,
    parameter_scores: Vec<ParameterScores>,
}

impl ValidationIterationScores {
    /// Create an empty record for `iteration`.
    #[must_use]
    pub const fn new(iteration: u64) -> Self {
        Self {
            iteration,
            parameter_scores: Vec::new(),
        }
    }

    /// Create a record from prepared entries.
    #[must_use]
    pub const fn from_entries(iteration: u64, parameter_scores: Vec<ParameterScores>) -> Self {
        Self {
            iteration,
            parameter_scores,
        }
    }

    /// Append scores for a (dataset, parameter set) pair.
    #[must_use]
    pub fn with_scores(
        mut self,
        dataset: impl Into<String>,
        parameters: PostProcessorParameters,
        scores: Vec<f64>,
    ) -> Self {
        self.parameter_scores
            .push(ParameterScores::new(dataset, parameters, scores));
        self
    }

    /// Append an evaluator's output for a (dataset, parameter set) pair.
    #[must_use]
    pub fn with_evaluation(
        self,
        dataset: impl Into<String>,
        parameters: PostProcessorParameters,
        scores: &EvaluationScores,
    ) -> Self {
        self.with_scores(dataset, parameters, scores.values())
    }

    /// Get the iteration.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Get the entries.
    #[must_use]
    pub fn parameter_scores(&self) -> &[ParameterScores] {
        &self.parameter_scores
    }

    /// Shape of the record: per-entry score counts.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.parameter_scores.iter().map(|p| p.scores.len()).collect()
    }

    /// Check that no (dataset, parameter set) pair is scored twice.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] naming the repeated pair.
    pub fn validate(&self) -> Result<()> {
        let pairs: Vec<(&str, &PostProcessorParameters)> = self
            .parameter_scores
            .iter()
            .map(|p| (p.dataset.as_str(), &p.parameters))
            .collect();
        match first_repeat(&pairs) {
            Some((dataset, parameters)) => Err(Error::InvalidInput(format!(
                "iteration {} scores dataset '{dataset}' with {} twice",
                self.iteration,
                parameters.label()
            ))),
            None => Ok(()),
        }
    }

    /// All scores flattened in dataset × parameter × criterion order.
    #[must_use]
    pub fn flattened(&self) -> Vec<f64> {
        self.parameter_scores
            .iter()
            .flat_map(|p| p.scores.iter().copied())
            .collect()
    }
}

/// Validation scores of one run: fixed axes plus an ordered series of records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationScores {
    axes: ValidationAxes,
    scores: Vec<ValidationIterationScores>,
}

impl ValidationScores {
    /// Create an empty series over the given axes.
    #[must_use]
    pub const fn new(axes: ValidationAxes) -> Self {
        Self {
            axes,
            scores: Vec::new(),
        }
    }

    /// Same axes, different records.
    #[must_use]
    pub fn subscores(&self, scores: Vec<ValidationIterationScores>) -> Self {
        Self {
            axes: self.axes.clone(),
            scores,
        }
    }

    /// Record a validation iteration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the iteration does not come after the last
    /// recorded one, if the record scores a (dataset, parameter set) pair
    /// twice, or if the axes repeat an entry.
    pub fn add_iteration_scores(&mut self, scores: ValidationIterationScores) -> Result<()> {
        self.axes.validate()?;
        scores.validate()?;
        if let Some(last) = self.scores.last() {
            if scores.iteration <= last.iteration {
                return Err(Error::InvalidInput(format!(
                    "validation iteration {} recorded after {}",
                    scores.iteration, last.iteration
                )));
            }
        }
        self.scores.push(scores);
        Ok(())
    }

    /// The first iteration not yet validated: last iteration + 1, or 0.
    #[must_use]
    pub fn validated_until(&self) -> u64 {
        self.scores.last().map_or(0, |s| s.iteration + 1)
    }

    /// Drop every record at or after `iteration`.
    pub fn delete_after(&mut self, iteration: u64) {
        self.scores.retain(|s| s.iteration < iteration);
    }

    /// Compare against records held elsewhere.
    ///
    /// Returns `(true, 0)` if the other side is ahead (it should be replaced by
    /// this series), otherwise `(false, from)` where `from` is the first
    /// iteration the other side is missing.
    #[must_use]
    pub fn compare(&self, existing: &[ValidationIterationScores]) -> (bool, u64) {
        let Some(existing_until) = existing.iter().map(|s| s.iteration + 1).max() else {
            return (false, 0);
        };
        if existing_until > self.validated_until() {
            (true, 0)
        } else {
            (false, existing_until)
        }
    }

    /// Get the axes.
    #[must_use]
    pub const fn axes(&self) -> &ValidationAxes {
        &self.axes
    }

    /// Get the criteria.
    #[must_use]
    pub fn criteria(&self) -> &[Criterion] {
        &self.axes.criteria
    }

    /// All records, ordered by iteration.
    #[must_use]
    pub fn iteration_scores(&self) -> &[ValidationIterationScores] {
        &self.scores
    }

    /// Records at or after `iteration`.
    #[must_use]
    pub fn since(&self, iteration: u64) -> &[ValidationIterationScores] {
        let start = self.scores.partition_point(|s| s.iteration < iteration);
        &self.scores[start..]
    }

    /// Number of validated iterations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check if nothing has been validated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
