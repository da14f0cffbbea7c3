// Copyright 2025 Cowboy AI, LLC.

//! Store-client boundary
//!
//! The narrow operation contract through which the recorders consume the
//! remote log store. The transport itself (connection management, TLS,
//! gRPC serialization, low-level retries) lives behind implementations of
//! [`LogStore`]; this crate implements the contract only in memory, for
//! tests and local development ([`crate::memory::InMemoryLogStore`]).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use thiserror::Error;

/// Topic patterns excluded from the global feed by default: the store's
/// own system events.
pub const DEFAULT_EXCLUDE_FILTER: &[&str] = &[r"\$.+"];

/// Topic pattern matching snapshot records, excluded from the global feed
/// by construction.
pub const SNAPSHOT_TOPIC_PATTERN: &str = ".*Snapshot";

/// Errors reported by a [`LogStore`] implementation.
///
/// The recorders depend on three conditions being distinguishable:
/// [`StoreError::WrongCurrentVersion`] on append,
/// [`StoreError::StreamNotFound`] on stream reads, and
/// [`StoreError::ConsumerTooSlow`] on live subscriptions. Everything else
/// is treated as a generic persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Expected-version check failed on append
    #[error(
        "wrong current version for stream {stream_name:?}: \
         expected {expected}, current {current:?}"
    )]
    WrongCurrentVersion {
        /// Stream the append was directed at
        stream_name: String,
        /// The expected version passed by the caller
        expected: ExpectedVersion,
        /// The stream's actual current version, if it exists
        current: Option<u64>,
    },

    /// The requested stream does not exist
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// The store dropped a live feed because the consumer fell behind
    #[error("consumer too slow")]
    ConsumerTooSlow,

    /// A filter pattern could not be compiled
    #[error("invalid filter pattern: {0}")]
    InvalidFilter(String),

    /// Failed to reach the store
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// General storage operation failed
    #[error("storage error: {0}")]
    StorageError(String),
}

/// Expected stream version for an append, the store's optimistic
/// concurrency control handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Skip the concurrency check entirely
    Any,
    /// The stream must not exist yet
    NoStream,
    /// The stream's current position must equal this value
    Exact(u64),
}

impl fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedVersion::Any => write!(f, "any"),
            ExpectedVersion::NoStream => write!(f, "no stream"),
            ExpectedVersion::Exact(v) => write!(f, "{v}"),
        }
    }
}

/// A proposed event in wire form: topic plus opaque payload and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Topic string identifying the event type
    pub topic: String,

    /// Opaque event state
    pub data: Bytes,

    /// Opaque event metadata; carries the snapshot version envelope for
    /// snapshot records, empty otherwise
    pub metadata: Bytes,

    /// MIME type of `data`
    pub content_type: String,
}

/// An event as recorded by the store, carrying both its per-stream
/// position and its global commit position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Name of the stream the event was appended to
    pub stream_name: String,

    /// Zero-based position within its stream
    pub stream_position: u64,

    /// Global commit position, strictly increasing across the whole store
    pub commit_position: u64,

    /// Topic string identifying the event type
    pub topic: String,

    /// Opaque event state
    pub data: Bytes,

    /// Opaque event metadata
    pub metadata: Bytes,

    /// When the store recorded the event
    pub recorded_at: DateTime<Utc>,
}

/// Topic filter for global-log reads and subscriptions.
///
/// Patterns are full-match regexes over the event topic. Exclusions win
/// priority: an event matching any `exclude` pattern is dropped even when
/// it also matches an `include` pattern. An empty `include` list admits
/// every non-excluded event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFilter {
    /// Patterns for topics to drop
    pub exclude: Vec<String>,

    /// Patterns for topics to admit; empty means all
    pub include: Vec<String>,
}

/// A live, ordered tail of recorded events.
///
/// Yields `Err(StoreError::ConsumerTooSlow)` when the store drops the
/// feed because the consumer fell behind; the feed is dead after that and
/// must be re-established with [`LogStore::subscribe_all`].
pub type LiveEventStream = Pin<Box<dyn Stream<Item = Result<RecordedEvent, StoreError>> + Send>>;

/// Operation contract of the remote, globally-ordered, stream-partitioned
/// log store. Consumed by the recorders, implemented once per target store
/// version.
#[async_trait]
pub trait LogStore: Send + Sync + fmt::Debug {
    /// Append events atomically to one stream, subject to the expected
    /// version, returning the call's global commit position.
    ///
    /// The store reports one commit position per append call, not one per
    /// event.
    async fn append(
        &self,
        stream_name: &str,
        expected: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> Result<u64, StoreError>;

    /// Read up to `limit` events from one stream, starting at
    /// `start` (inclusive; `None` means the stream start, or its end when
    /// reading backwards).
    async fn read_stream(
        &self,
        stream_name: &str,
        start: Option<u64>,
        backwards: bool,
        limit: u64,
    ) -> Result<Vec<RecordedEvent>, StoreError>;

    /// Read up to `limit` events from the global log in commit order,
    /// starting at `start` (inclusive), applying the topic filter.
    async fn read_all(
        &self,
        start: Option<u64>,
        filter: &ReadFilter,
        limit: u64,
    ) -> Result<Vec<RecordedEvent>, StoreError>;

    /// The stream's current position, or `None` if it does not exist.
    async fn get_current_version(&self, stream_name: &str) -> Result<Option<u64>, StoreError>;

    /// The highest commit position among events admitted by the filter,
    /// or `None` if there are none.
    async fn get_max_position(&self, filter: &ReadFilter) -> Result<Option<u64>, StoreError>;

    /// Open a live tail of the global log, delivering events with commit
    /// position strictly greater than `after` (`None` means from the
    /// beginning), applying the topic filter.
    async fn subscribe_all(
        &self,
        after: Option<u64>,
        filter: &ReadFilter,
    ) -> Result<LiveEventStream, StoreError>;
}
