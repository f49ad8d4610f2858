//! Error types for Trueno-Runstore
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

use crate::configs::ConfigKind;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Runstore error types
#[derive(Error, Debug)]
pub enum Error {
    /// A different record already claimed this human-readable name
    #[error("{kind} config name '{name}' is already taken by {existing_id} (incoming record {incoming_id})\nPick a new name or reuse the stored config")]
    DuplicateName {
        /// Config kind whose namespace holds the name
        kind: ConfigKind,
        /// The contested name
        name: String,
        /// Content id the name currently points to
        existing_id: String,
        /// Content id of the rejected record
        incoming_id: String,
    },

    /// Same content id, different content (never overwritten)
    #[error("Data for {kind} {id} does not match the stored entry (fields: {})\nFound\n\n{existing}\n\nin store, but was given\n\n{incoming}", fields.join(", "))]
    ContentConflict {
        /// Config kind of the record
        kind: ConfigKind,
        /// Content id both documents hash to
        id: String,
        /// Top-level fields whose values differ
        fields: Vec<String>,
        /// Stored document
        existing: Box<serde_json::Value>,
        /// Incoming document
        incoming: Box<serde_json::Value>,
    },

    /// Conditional write kept racing; the whole call may be retried
    #[error("Write to '{key}' did not settle after {attempts} attempts (concurrent writers?)\nRetry the operation")]
    TransientWriteRace {
        /// Backend key that kept racing
        key: String,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Backend observed a concurrent modification of a key mid-operation
    #[error("Concurrent modification of '{0}'")]
    WriteContention(String),

    /// Stored type tag is not known to this build
    #[error("Unknown {family} type tag '{tag}'\nThe record was written by a build that knows more config types")]
    UnresolvableTypeTag {
        /// Family the tag was resolved against
        family: String,
        /// The unknown tag
        tag: String,
    },

    /// Best-of requested on a table without criteria
    #[error("Cannot determine 'best' without a criteria dimension")]
    EmptyCriteria,

    /// Record lookup failed
    #[error("No {kind} named '{name}' in store")]
    NotFound {
        /// What was looked up (config kind or series)
        kind: String,
        /// Name or id that was looked up
        name: String,
    },

    /// Local series is behind the stored one and the policy forbids truncation
    #[error("Local {series} for run '{run}' ends at {local}, store already holds up to {remote}\nPull first or switch the reconcile policy to local_wins")]
    StaleLocalSeries {
        /// Run the series belongs to
        run: String,
        /// Series name (`training_stats` / `validation_scores`)
        series: &'static str,
        /// Local frontier
        local: u64,
        /// Remote frontier
        remote: u64,
    },

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend storage error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the whole call can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientWriteRace { .. } | Self::WriteContention(_))
    }
}
