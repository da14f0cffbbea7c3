// Copyright 2025 Cowboy AI, LLC.

//! Error types for recorder operations

use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the aggregate and application recorders.
///
/// Reading a nonexistent stream is *not* an error: it yields an empty result.
/// Nothing here is retried automatically; retry-with-rebase after a
/// [`RecorderError::Conflict`] is the application layer's responsibility.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Caller misuse detected before any store call: a batch spanning more
    /// than one stream, or a non-gapless version sequence.
    #[error("validation error: {0}")]
    Validation(String),

    /// Optimistic concurrency check failed at the store: another writer
    /// appended to the stream first.
    #[error("concurrency conflict: {source}")]
    Conflict {
        /// The store's version-mismatch error
        #[source]
        source: StoreError,
    },

    /// Store or transport failure not classifiable as a conflict.
    #[error("persistence error: {source}")]
    Persistence {
        /// The underlying store error
        #[source]
        source: StoreError,
    },

    /// Recorded data could not be decoded, e.g. a corrupt snapshot
    /// metadata envelope.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A global-log stream name could not be parsed as an originator id.
    /// Surfaced rather than dropped so corruption stays visible.
    #[error("invalid stream name {stream_name:?}: {source}")]
    InvalidStreamName {
        /// The offending stream name
        stream_name: String,
        /// The parse failure
        #[source]
        source: uuid::Error,
    },
}

impl RecorderError {
    /// Whether this error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RecorderError::Conflict { .. })
    }
}

impl From<StoreError> for RecorderError {
    fn from(source: StoreError) -> Self {
        match source {
            StoreError::WrongCurrentVersion { .. } => RecorderError::Conflict { source },
            _ => RecorderError::Persistence { source },
        }
    }
}

/// Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;
