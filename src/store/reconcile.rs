//! Reconciliation of a local progress series against the stored one.

use serde::{Deserialize, Serialize};

/// What to do when the local series is not ahead of the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Truncate the stored series and write the local one in full.
    #[default]
    LocalWins,
    /// Refuse with [`Error::StaleLocalSeries`](crate::Error::StaleLocalSeries).
    /// Equal frontiers are treated as already in sync.
    RejectRollback,
}

/// Outcome of comparing two frontiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Nothing to write.
    Nothing,
    /// Append local records with iteration `>= from`.
    Append {
        /// First iteration to write.
        from: u64,
    },
    /// Delete the stored series and write the local one from scratch.
    Replace,
}

/// Plan a push from the local and remote frontiers.
///
/// An empty local series never touches the store.
#[must_use]
pub const fn plan(local_frontier: u64, remote_frontier: u64) -> ReconcilePlan {
    if local_frontier == 0 {
        ReconcilePlan::Nothing
    } else if remote_frontier == 0 {
        ReconcilePlan::Append { from: 0 }
    } else if local_frontier > remote_frontier {
        ReconcilePlan::Append {
            from: remote_frontier,
        }
    } else {
        ReconcilePlan::Replace
    }
}
