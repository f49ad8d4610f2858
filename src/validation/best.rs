//! Best value per criterion along one table dimension

use super::table::{split_at, to_table, Dim, Label, ScoreTable, Table};
use crate::configs::{Criterion, PostProcessorParameters};
use crate::experiment::ValidationScores;
use crate::{Error, Result};

/// Reduce `reduce_dim` to its best coordinate, per criterion.
///
/// Returns a coordinate table (index along `reduce_dim` of the best value)
/// and a value table, both over the remaining axes. Each criterion is
/// maximized or minimized according to its direction. The first (lowest)
/// index wins ties, NaN never wins, and a slice holding only NaN yields
/// `None` and NaN.
///
/// # Errors
///
/// - [`Error::EmptyCriteria`] if the table has no (or an empty) criteria axis
/// - [`Error::InvalidInput`] if `reduce_dim` is the criteria axis or missing
pub fn best_per_criterion(
    table: &ScoreTable,
    reduce_dim: Dim,
) -> Result<(Table<Option<usize>>, ScoreTable)> {
    let criteria_pos = table.position(Dim::Criterion).ok_or(Error::EmptyCriteria)?;
    let criteria = &table.axes()[criteria_pos];
    if criteria.is_empty() {
        return Err(Error::EmptyCriteria);
    }
    if reduce_dim == Dim::Criterion {
        return Err(Error::InvalidInput(
            "cannot reduce over the criteria axis".to_string(),
        ));
    }
    let reduce_pos = table
        .position(reduce_dim)
        .ok_or_else(|| Error::InvalidInput(format!("table has no {reduce_dim} axis")))?;

    let shape = table.shape();
    let n = shape[reduce_pos];
    let (outer, inner) = split_at(&shape, reduce_pos);
    // stride of the criteria axis within the reduced table
    let kept = if criteria_pos < reduce_pos {
        criteria_pos
    } else {
        criteria_pos - 1
    };
    let mut reduced_shape = shape.clone();
    reduced_shape.remove(reduce_pos);
    let criteria_stride: usize = reduced_shape[kept + 1..].iter().product();

    let mut coordinates = Vec::with_capacity(outer * inner);
    let mut values = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let cell = o * inner + i;
            let c = (cell / criteria_stride) % criteria.len();
            let criterion = criteria.criterion(c).ok_or(Error::EmptyCriteria)?;
            let slice = (0..n).map(|k| table.values()[(o * n + k) * inner + i]);
            let best = arg_best(criterion, slice);
            coordinates.push(best.map(|(k, _)| k));
            values.push(best.map_or(f64::NAN, |(_, v)| v));
        }
    }

    let mut axes = table.axes().to_vec();
    axes.remove(reduce_pos);
    Ok((
        Table::from_parts(axes.clone(), coordinates)?,
        Table::from_parts(axes, values)?,
    ))
}

/// Index and value of the best non-NaN value; first wins ties.
pub(crate) fn arg_best(
    criterion: &Criterion,
    values: impl IntoIterator<Item = f64>,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (k, v) in values.into_iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, incumbent)) if !criterion.improves(v, incumbent) => {}
            _ => best = Some((k, v)),
        }
    }
    best
}

/// The single best validation result for one criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct BestScore {
    /// Iteration the score was computed at.
    pub iteration: u64,
    /// Validation dataset.
    pub dataset: String,
    /// Post-processor parameter set.
    pub parameters: PostProcessorParameters,
    /// The score.
    pub value: f64,
}

impl ValidationScores {
    /// Best score for `criterion` across every iteration, dataset and
    /// parameter set, using the criterion's direction.
    ///
    /// Ties go to the lowest iteration, then dataset, then parameter set.
    /// Records excluded from [`to_table`] are ignored. Returns `None` if every
    /// score is NaN.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the criterion is not on the axes.
    pub fn best(&self, criterion: &Criterion) -> Result<Option<BestScore>> {
        let index = self
            .criteria()
            .iter()
            .position(|c| c.name == criterion.name)
            .ok_or_else(|| Error::NotFound {
                kind: "criterion".to_string(),
                name: criterion.name.clone(),
            })?;
        let table = to_table(self).select(Dim::Criterion, index)?;

        let Some((flat, value)) = arg_best(criterion, table.values().iter().copied()) else {
            return Ok(None);
        };
        let coordinate = table.coordinate(flat);
        let label = |pos: usize| &table.axes()[pos].labels()[coordinate[pos]];
        match (label(0), label(1), label(2)) {
            (Label::Iteration(iteration), Label::Dataset(dataset), Label::Parameter(parameters)) => {
                Ok(Some(BestScore {
                    iteration: *iteration,
                    dataset: dataset.clone(),
                    parameters: parameters.clone(),
                    value,
                }))
            }
            _ => Err(Error::InvalidInput(
                "validation table axes out of order".to_string(),
            )),
        }
    }
}
