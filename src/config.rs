// Copyright 2025 Cowboy AI, LLC.

//! Adapter configuration
//!
//! An explicit configuration struct passed to recorder constructors; the
//! adapter keeps no ambient state. Connection URI and credentials belong
//! to whoever constructs the concrete [`crate::store::LogStore`].

use crate::store::{DEFAULT_EXCLUDE_FILTER, SNAPSHOT_TOPIC_PATTERN};
use serde::{Deserialize, Serialize};

/// Reserved prefix deriving a snapshot stream name from its event stream
/// name. The `$` keeps the derived name out of the originator namespace.
pub const SNAPSHOT_STREAM_PREFIX: &str = "snapshot-$";

/// Configuration for the recorders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Prefix for snapshot stream names
    pub snapshot_stream_prefix: String,

    /// The version number of the first event in every stream
    pub initial_version: u64,

    /// Topic patterns excluded from the notification feed; covers the
    /// store's system events and snapshot records
    pub exclude_patterns: Vec<String>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        let mut exclude_patterns: Vec<String> = DEFAULT_EXCLUDE_FILTER
            .iter()
            .map(|p| (*p).to_string())
            .collect();
        exclude_patterns.push(SNAPSHOT_TOPIC_PATTERN.to_string());
        Self {
            snapshot_stream_prefix: SNAPSHOT_STREAM_PREFIX.to_string(),
            initial_version: 0,
            exclude_patterns,
        }
    }
}

impl AdapterConfig {
    /// Derive the snapshot stream name for an event stream name.
    pub fn snapshot_stream_name(&self, stream_name: &str) -> String {
        format!("{}{}", self.snapshot_stream_prefix, stream_name)
    }
}
