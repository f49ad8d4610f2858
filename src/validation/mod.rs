//! Validation score aggregation
//!
//! Reshapes a run's [`ValidationScores`](crate::experiment::ValidationScores)
//! into a dense (iteration × dataset × parameter × criterion) [`ScoreTable`]
//! and reduces it to the best coordinate per criterion.
//!
//! ```rust
//! use trueno_runstore::configs::Criterion;
//! use trueno_runstore::validation::{best_per_criterion, Axis, Dim, Label, Table};
//!
//! let table = Table::from_parts(
//!     vec![
//!         Axis::new(Dim::Iteration, (0..3).map(Label::Iteration).collect()),
//!         Axis::criteria(&[Criterion::higher("accuracy")]),
//!     ],
//!     vec![0.2, 0.9, 0.5],
//! )?;
//! let (coordinates, values) = best_per_criterion(&table, Dim::Iteration)?;
//! assert_eq!(coordinates.values(), &[Some(1)]);
//! assert_eq!(values.values(), &[0.9]);
//! # Ok::<(), trueno_runstore::Error>(())
//! ```

mod best;
mod table;
mod topk;

pub use best::{best_per_criterion, BestScore};
pub use table::{to_table, Axis, Dim, Label, ScoreTable, Table};
pub use topk::{top_k, RankedScore};
