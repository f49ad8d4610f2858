//! # Trueno-Runstore: Persistence Core for Resumable Experiment Runs
//!
//! **Version**: 0.1.0
//!
//! Trueno-Runstore keeps the configuration and progress of long-running,
//! resumable training runs in a store shared by many processes:
//!
//! - **Config store**: content-addressed, idempotent config records. Two
//!   independently built but identical configs collapse to one record;
//!   genuine conflicts are refused, never overwritten.
//! - **Stats store**: append-only training stats and validation scores,
//!   reconciled against a run's local copy by frontier.
//! - **Validation aggregation**: validation scores as an
//!   (iteration × dataset × parameter × criterion) table, reduced to the best
//!   coordinate per criterion.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Content conflicts stop the line instead of being resolved silently
//! - **Poka-Yoke safety**: Conditional writes make duplicate names impossible to race past
//! - **Genchi Genbutsu**: Schema drift is logged with the offending iteration
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_runstore::config::{StoreConfig, Stores};
//! use trueno_runstore::experiment::TrainingStats;
//!
//! let stores = Stores::open(&StoreConfig::default())?;
//!
//! let mut stats = TrainingStats::new();
//! stats.add_iteration(0, 0.9, 1.2)?;
//! stats.add_iteration(1, 0.8, 1.1)?;
//! stores.stats.push_training_stats("run-1", &stats)?;
//!
//! assert_eq!(stores.stats.pull_training_stats("run-1")?, stats);
//! # Ok::<(), trueno_runstore::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod configs;
pub mod error;
pub mod experiment;
pub mod kv;
pub mod serialize;
pub mod store;
pub mod validation;

pub use error::{Error, Result};
