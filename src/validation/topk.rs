//! Top-K selection over one criterion of a score table
//!
//! **Problem**: ranking every cell of a large sweep is O(N log N); most
//! callers want the K best parameterizations.
//!
//! **Solution**: bounded binary heap, O(N log K). The heap keeps the K best
//! seen so far with the worst on top, so each new value is compared once.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::table::{Dim, ScoreTable};
use crate::{Error, Result};

/// One ranked table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedScore {
    /// Coordinate in the source table (one index per axis).
    pub coordinate: Vec<usize>,
    /// The score.
    pub value: f64,
}

// Higher is better: min-heap, smallest (then latest) on top
#[derive(Debug)]
struct MinHeapItem {
    value: f64,
    index: usize,
}

impl PartialEq for MinHeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MinHeapItem {}

impl Ord for MinHeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for MinHeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Lower is better: max-heap, largest (then latest) on top
#[derive(Debug)]
struct MaxHeapItem {
    value: f64,
    index: usize,
}

impl PartialEq for MaxHeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MaxHeapItem {}

impl Ord for MaxHeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for MaxHeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `k` best cells for `criterion`, best first.
///
/// NaN cells are skipped. Equal values keep row-major order.
///
/// # Errors
///
/// - [`Error::EmptyCriteria`] if the table has no criteria axis
/// - [`Error::NotFound`] if `criterion` is not on it
pub fn top_k(table: &ScoreTable, criterion: &str, k: usize) -> Result<Vec<RankedScore>> {
    let criteria_pos = table.position(Dim::Criterion).ok_or(Error::EmptyCriteria)?;
    let axis = &table.axes()[criteria_pos];
    let (c, higher_is_better) = (0..axis.len())
        .find_map(|i| {
            axis.criterion(i)
                .filter(|found| found.name == criterion)
                .map(|found| (i, found.higher_is_better))
        })
        .ok_or_else(|| Error::NotFound {
            kind: "criterion".to_string(),
            name: criterion.to_string(),
        })?;

    let selected = table.select(Dim::Criterion, c)?;
    let values = selected.values();
    let indices = if higher_is_better {
        select_largest(values, k)
    } else {
        select_smallest(values, k)
    };

    Ok(indices
        .into_iter()
        .map(|flat| {
            let mut coordinate = selected.coordinate(flat);
            coordinate.insert(criteria_pos, c);
            RankedScore {
                coordinate,
                value: values[flat],
            }
        })
        .collect())
}

fn select_largest(values: &[f64], k: usize) -> Vec<usize> {
    let mut heap: BinaryHeap<MinHeapItem> = BinaryHeap::with_capacity(k);
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() || k == 0 {
            continue;
        }
        if heap.len() < k {
            heap.push(MinHeapItem { value, index });
        } else if let Some(top) = heap.peek() {
            if value > top.value {
                heap.pop();
                heap.push(MinHeapItem { value, index });
            }
        }
    }
    let mut result = heap.into_vec();
    result.sort();
    result.into_iter().map(|item| item.index).collect()
}

fn select_smallest(values: &[f64], k: usize) -> Vec<usize> {
    let mut heap: BinaryHeap<MaxHeapItem> = BinaryHeap::with_capacity(k);
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() || k == 0 {
            continue;
        }
        if heap.len() < k {
            heap.push(MaxHeapItem { value, index });
        } else if let Some(top) = heap.peek() {
            if value < top.value {
                heap.pop();
                heap.push(MaxHeapItem { value, index });
            }
        }
    }
    let mut result = heap.into_vec();
    result.sort();
    result.into_iter().map(|item| item.index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::Criterion;
    use crate::validation::{Axis, Label, Table};

    fn table() -> ScoreTable {
        Table::from_parts(
            vec![
                Axis::new(Dim::Iteration, (0..5).map(Label::Iteration).collect()),
                Axis::criteria(&[Criterion::higher("acc"), Criterion::lower("loss")]),
            ],
            vec![
                0.1, 5.0, //
                0.9, 1.0, //
                f64::NAN, 0.5, //
                0.9, 3.0, //
                0.4, f64::NAN,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_top_k_higher_is_better() {
        let ranked = top_k(&table(), "acc", 3).unwrap();
        let coords: Vec<_> = ranked.iter().map(|r| r.coordinate.clone()).collect();
        assert_eq!(coords, vec![vec![1, 0], vec![3, 0], vec![4, 0]]);
    }

    #[test]
    fn test_top_k_ties_keep_row_major_order() {
        let table = Table::from_parts(
            vec![
                Axis::new(Dim::Iteration, (0..4).map(Label::Iteration).collect()),
                Axis::criteria(&[Criterion::higher("acc")]),
            ],
            vec![0.5, 0.7, 0.5, 0.5],
        )
        .unwrap();

        let ranked = top_k(&table, "acc", 3).unwrap();
        let coords: Vec<_> = ranked.iter().map(|r| r.coordinate[0]).collect();
        assert_eq!(coords, vec![1, 0, 2]);
    }

    #[test]
    fn test_top_k_lower_is_better() {
        let ranked = top_k(&table(), "loss", 2).unwrap();
        let values: Vec<f64> = ranked.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![0.5, 1.0]);
        assert_eq!(ranked[0].coordinate, vec![2, 1]);
    }

    #[test]
    fn test_top_k_edge_cases() {
        assert!(top_k(&table(), "acc", 0).unwrap().is_empty());
        assert_eq!(top_k(&table(), "acc", 100).unwrap().len(), 4);
        assert!(matches!(
            top_k(&table(), "f1", 1),
            Err(Error::NotFound { .. })
        ));
    }
}
