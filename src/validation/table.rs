//! Score tables: validation records reshaped to a dense row-major array

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::configs::{Criterion, PostProcessorParameters};
use crate::experiment::{ValidationIterationScores, ValidationScores};
use crate::{Error, Result};

/// A table dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Validation iteration.
    Iteration,
    /// Validation dataset.
    Dataset,
    /// Post-processor parameter set.
    Parameter,
    /// Evaluation criterion.
    Criterion,
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Iteration => "iteration",
            Self::Dataset => "dataset",
            Self::Parameter => "parameter",
            Self::Criterion => "criterion",
        })
    }
}

/// Coordinate label along one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// An iteration.
    Iteration(u64),
    /// A dataset name.
    Dataset(String),
    /// A parameter set.
    Parameter(PostProcessorParameters),
    /// A criterion.
    Criterion(Criterion),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iteration(iteration) => write!(f, "{iteration}"),
            Self::Dataset(name) => f.write_str(name),
            Self::Parameter(parameters) => f.write_str(&parameters.label()),
            Self::Criterion(criterion) => f.write_str(&criterion.name),
        }
    }
}

/// One labelled axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    dim: Dim,
    labels: Vec<Label>,
}

impl Axis {
    /// Create an axis.
    #[must_use]
    pub const fn new(dim: Dim, labels: Vec<Label>) -> Self {
        Self { dim, labels }
    }

    /// Criteria axis.
    #[must_use]
    pub fn criteria(criteria: &[Criterion]) -> Self {
        Self::new(
            Dim::Criterion,
            criteria.iter().cloned().map(Label::Criterion).collect(),
        )
    }

    /// Get the dimension.
    #[must_use]
    pub const fn dim(&self) -> Dim {
        self.dim
    }

    /// Get the labels.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the axis has no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Criterion at `index`, if this is the criteria axis.
    #[must_use]
    pub fn criterion(&self, index: usize) -> Option<&Criterion> {
        match self.labels.get(index) {
            Some(Label::Criterion(criterion)) => Some(criterion),
            _ => None,
        }
    }
}

/// Dense table over labelled axes, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    axes: Vec<Axis>,
    values: Vec<T>,
    dropped: Vec<u64>,
}

/// Table of scores; NaN marks an undefined score.
pub type ScoreTable = Table<f64>;

impl<T> Table<T> {
    /// Create a table from axes and row-major values.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if axes repeat a dimension or the value count
    /// does not match the axes.
    pub fn from_parts(axes: Vec<Axis>, values: Vec<T>) -> Result<Self> {
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|a| a.dim == axis.dim) {
                return Err(Error::InvalidInput(format!("duplicate {} axis", axis.dim)));
            }
        }
        let expected: usize = axes.iter().map(Axis::len).product();
        if values.len() != expected {
            return Err(Error::InvalidInput(format!(
                "{} values for a table of {expected} cells",
                values.len()
            )));
        }
        Ok(Self {
            axes,
            values,
            dropped: Vec::new(),
        })
    }

    /// Get the axes in storage order.
    #[must_use]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Position of a dimension among the axes.
    #[must_use]
    pub fn position(&self, dim: Dim) -> Option<usize> {
        self.axes.iter().position(|a| a.dim == dim)
    }

    /// Get the axis of a dimension.
    #[must_use]
    pub fn axis(&self, dim: Dim) -> Option<&Axis> {
        self.axes.iter().find(|a| a.dim == dim)
    }

    /// Axis lengths.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::len).collect()
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the table has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterations excluded while building the table.
    #[must_use]
    pub fn dropped_iterations(&self) -> &[u64] {
        &self.dropped
    }

    /// Value at a coordinate (one index per axis).
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.flat_index(index).and_then(|i| self.values.get(i))
    }

    /// Row-major offset of a coordinate.
    #[must_use]
    pub fn flat_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.axes.len() {
            return None;
        }
        let mut flat = 0;
        for (axis, &i) in self.axes.iter().zip(index) {
            if i >= axis.len() {
                return None;
            }
            flat = flat * axis.len() + i;
        }
        Some(flat)
    }

    /// Coordinate of a row-major offset.
    #[must_use]
    pub fn coordinate(&self, mut flat: usize) -> Vec<usize> {
        let mut index = vec![0; self.axes.len()];
        for (slot, axis) in index.iter_mut().zip(&self.axes).rev() {
            let len = axis.len().max(1);
            *slot = flat % len;
            flat /= len;
        }
        index
    }

    /// Fix `dim` at `index`, dropping that axis.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the table has no such axis or `index` is out
    /// of range.
    pub fn select(&self, dim: Dim, index: usize) -> Result<Self>
    where
        T: Clone,
    {
        let pos = self
            .position(dim)
            .ok_or_else(|| Error::InvalidInput(format!("table has no {dim} axis")))?;
        let shape = self.shape();
        if index >= shape[pos] {
            return Err(Error::InvalidInput(format!(
                "{dim} index {index} out of range (len {})",
                shape[pos]
            )));
        }

        let (outer, inner) = split_at(&shape, pos);
        let mut values = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let base = (o * shape[pos] + index) * inner;
            values.extend_from_slice(&self.values[base..base + inner]);
        }
        let mut axes = self.axes.clone();
        axes.remove(pos);
        Ok(Self {
            axes,
            values,
            dropped: self.dropped.clone(),
        })
    }
}

/// Cells before and after axis `pos` in row-major order.
pub(crate) fn split_at(shape: &[usize], pos: usize) -> (usize, usize) {
    (
        shape[..pos].iter().product(),
        shape[pos + 1..].iter().product(),
    )
}

/// Reshape a validation series to an (iteration, dataset, parameter,
/// criterion) table.
///
/// Records whose shape differs from the most common one (ties go to the most
/// recent shape), or that do not cover the axes exactly, are left out with a
/// warning and listed in [`Table::dropped_iterations`].
#[must_use]
pub fn to_table(scores: &ValidationScores) -> ScoreTable {
    let axes = scores.axes();
    let records = scores.iteration_scores();
    let majority = majority_shape(records);

    let per_record = axes.expected_len();
    let mut iterations = Vec::new();
    let mut values = Vec::with_capacity(records.len() * per_record);
    let mut dropped = Vec::new();
    for record in records {
        if majority.as_ref() != Some(&record.shape()) {
            warn!(
                iteration = record.iteration(),
                shape = ?record.shape(),
                expected = ?majority,
                "dropping validation record with a drifted score shape"
            );
            dropped.push(record.iteration());
            continue;
        }
        match place(scores, record) {
            Some(placed) => {
                iterations.push(Label::Iteration(record.iteration()));
                values.extend(placed);
            }
            None => {
                warn!(
                    iteration = record.iteration(),
                    len = record.flattened().len(),
                    expected = per_record,
                    "dropping validation record that does not match the validation axes"
                );
                dropped.push(record.iteration());
            }
        }
    }

    let axes = vec![
        Axis::new(Dim::Iteration, iterations),
        Axis::new(
            Dim::Dataset,
            axes.datasets.iter().cloned().map(Label::Dataset).collect(),
        ),
        Axis::new(
            Dim::Parameter,
            axes.parameters.iter().cloned().map(Label::Parameter).collect(),
        ),
        Axis::criteria(&axes.criteria),
    ];
    Table {
        axes,
        values,
        dropped,
    }
}

fn majority_shape(records: &[ValidationIterationScores]) -> Option<Vec<usize>> {
    let mut tally: FxHashMap<Vec<usize>, (usize, usize)> = FxHashMap::default();
    for (position, record) in records.iter().enumerate() {
        let entry = tally.entry(record.shape()).or_insert((0, position));
        entry.0 += 1;
        entry.1 = position;
    }
    tally
        .into_iter()
        .max_by_key(|(_, (count, last))| (*count, *last))
        .map(|(shape, _)| shape)
}

/// Scores of one record in (dataset, parameter, criterion) order, or `None`
/// if the record does not cover the axes exactly.
fn place(scores: &ValidationScores, record: &ValidationIterationScores) -> Option<Vec<f64>> {
    let axes = scores.axes();
    let criteria = axes.criteria.len();
    if record.flattened().len() != axes.expected_len() {
        return None;
    }
    let mut placed = vec![f64::NAN; axes.expected_len()];
    let mut seen = vec![false; axes.datasets.len() * axes.parameters.len()];
    for entry in record.parameter_scores() {
        let d = axes.dataset_position(entry.dataset())?;
        let p = axes.parameter_position(entry.parameters())?;
        let cell = d * axes.parameters.len() + p;
        if entry.scores().len() != criteria || std::mem::replace(&mut seen[cell], true) {
            return None;
        }
        placed[cell * criteria..(cell + 1) * criteria].copy_from_slice(entry.scores());
    }
    Some(placed)
}
