//! Persistence for config records and run progress
//!
//! - [`ConfigStore`]: content-addressed, idempotent config records
//! - [`StatsStore`]: append-only training stats and validation scores,
//!   reconciled against the local copy of a run

mod config_store;
mod reconcile;
mod stats_store;

pub use config_store::{ConfigStore, DEFAULT_UPSERT_ATTEMPTS};
pub use reconcile::{plan, ReconcilePlan, ReconcilePolicy};
pub use stats_store::StatsStore;
