//! Error types for the sample store

use std::fmt;

use chrono::{DateTime, Utc};

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while appending to or querying the sample store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The sample is not strictly newer than the newest retained sample
    OutOfOrderSample {
        newest: DateTime<Utc>,
        rejected: DateTime<Utc>,
    },

    /// Query range with `from > to`
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// The store has never received a sample
    NotFound,

    /// Retention policy without a finite bound, or with a zero bound
    InvalidRetentionPolicy(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::OutOfOrderSample { newest, rejected } => write!(
                f,
                "sample at {} is not newer than the newest stored sample at {}",
                rejected.to_rfc3339(),
                newest.to_rfc3339()
            ),
            StoreError::InvalidRange { from, to } => write!(
                f,
                "invalid range: from ({}) is after to ({})",
                from.to_rfc3339(),
                to.to_rfc3339()
            ),
            StoreError::NotFound => write!(f, "no sample has been recorded yet"),
            StoreError::InvalidRetentionPolicy(msg) => {
                write!(f, "invalid retention policy: {}", msg)
            }
        }
    }
}

impl std::error::Error for StoreError {}
