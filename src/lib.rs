// Copyright 2025 Cowboy AI, LLC.

//! # EventStore Adapter
//!
//! Event-sourcing recorders for remote, globally-ordered,
//! stream-partitioned log stores (EventStoreDB/KurrentDB-style systems).
//!
//! The crate reconciles three ordering/identity models on top of one
//! store: per-stream version numbers, a global monotonic commit position,
//! and snapshot streams that coexist with event streams.
//!
//! - [`AggregateRecorder`]: per-stream append and range-read with
//!   optimistic concurrency control and gapless versioning, plus the
//!   snapshot-stream variant
//! - [`ApplicationRecorder`]: the global notification log with cursor-based
//!   pagination, topic filtering, and live [`subscription::Subscription`]s
//! - [`store::LogStore`]: the narrow operation contract through which all
//!   wire operations are delegated; implemented in memory here
//!   ([`InMemoryLogStore`]) and by transport crates elsewhere
//!
//! Event state and metadata are opaque byte payloads tagged with a topic
//! string; the adapter never interprets them.
//!
//! ```no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use uuid::Uuid;
//! use eventstore_adapter::{AdapterConfig, ApplicationRecorder, InMemoryLogStore, StoredEvent};
//!
//! # async fn demo() -> Result<(), eventstore_adapter::RecorderError> {
//! let recorder = ApplicationRecorder::new(
//!     Arc::new(InMemoryLogStore::new()),
//!     AdapterConfig::default(),
//! );
//! let event = StoredEvent {
//!     originator_id: Uuid::new_v4(),
//!     originator_version: 0,
//!     topic: "example:Opened".to_string(),
//!     state: Bytes::from_static(b"{}"),
//! };
//! recorder.append(&[event]).await?;
//! let notifications = recorder.select_notifications(None, 10, None, &[], true).await?;
//! assert_eq!(notifications.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod aggregate;
pub mod application;
pub mod codec;
pub mod config;
pub mod errors;
pub mod events;
pub mod memory;
pub mod range;
pub mod store;
pub mod subscription;

pub use aggregate::AggregateRecorder;
pub use application::ApplicationRecorder;
pub use config::{AdapterConfig, SNAPSHOT_STREAM_PREFIX};
pub use errors::{RecorderError, RecorderResult};
pub use events::{Notification, StoredEvent};
pub use memory::InMemoryLogStore;
pub use range::ReadRange;
pub use store::{
    ExpectedVersion, LiveEventStream, LogStore, NewEvent, ReadFilter, RecordedEvent, StoreError,
    DEFAULT_EXCLUDE_FILTER, SNAPSHOT_TOPIC_PATTERN,
};
pub use subscription::{StopHandle, Subscription};
