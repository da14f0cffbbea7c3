// Copyright 2025 Cowboy AI, LLC.

//! In-memory log store
//!
//! A complete [`LogStore`] used by this crate's tests and for local
//! development: a single global commit log partitioned into streams, with
//! per-stream optimistic concurrency control and a broadcast-backed live
//! feed. A subscriber that falls behind the broadcast capacity gets the
//! same "consumer too slow" drop a remote store would deliver.

use crate::store::{
    ExpectedVersion, LiveEventStream, LogStore, NewEvent, ReadFilter, RecordedEvent, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

const DEFAULT_LIVE_CAPACITY: usize = 256;

/// In-memory [`LogStore`] implementation.
#[derive(Debug, Clone)]
pub struct InMemoryLogStore {
    state: Arc<RwLock<LogState>>,
    live_tx: broadcast::Sender<RecordedEvent>,
}

#[derive(Debug, Default)]
struct LogState {
    streams: HashMap<String, Vec<RecordedEvent>>,
    log: Vec<RecordedEvent>,
    next_commit_position: u64,
}

/// Compiled form of a [`ReadFilter`]: full-match regexes over the topic,
/// exclusions winning priority.
struct TopicFilter {
    exclude: Vec<Regex>,
    include: Vec<Regex>,
}

impl TopicFilter {
    fn compile(filter: &ReadFilter) -> Result<Self, StoreError> {
        Ok(Self {
            exclude: compile_patterns(&filter.exclude)?,
            include: compile_patterns(&filter.include)?,
        })
    }

    fn matches(&self, topic: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(topic)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(topic))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, StoreError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!(r"\A(?:{p})\z"))
                .map_err(|e| StoreError::InvalidFilter(e.to_string()))
        })
        .collect()
}

impl InMemoryLogStore {
    /// Create a store with the default live-feed capacity.
    pub fn new() -> Self {
        Self::with_live_capacity(DEFAULT_LIVE_CAPACITY)
    }

    /// Create a store whose live feed buffers at most `capacity` events
    /// per subscriber before dropping it as too slow.
    pub fn with_live_capacity(capacity: usize) -> Self {
        let (live_tx, _) = broadcast::channel(capacity);
        Self {
            state: Arc::new(RwLock::new(LogState {
                streams: HashMap::new(),
                log: Vec::new(),
                next_commit_position: 1,
            })),
            live_tx,
        }
    }
}

impl Default for InMemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append(
        &self,
        stream_name: &str,
        expected: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> Result<u64, StoreError> {
        if events.is_empty() {
            return Err(StoreError::StorageError(
                "cannot append an empty batch".to_string(),
            ));
        }
        let mut state = self.state.write().await;
        let current = state
            .streams
            .get(stream_name)
            .and_then(|s| s.last())
            .map(|e| e.stream_position);
        let accepted = match expected {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => current.is_none(),
            ExpectedVersion::Exact(v) => current == Some(v),
        };
        if !accepted {
            return Err(StoreError::WrongCurrentVersion {
                stream_name: stream_name.to_string(),
                expected,
                current,
            });
        }

        let mut stream_position = current.map_or(0, |p| p + 1);
        let mut last_commit_position = 0;
        for event in events {
            let commit_position = state.next_commit_position;
            state.next_commit_position += 1;
            let recorded = RecordedEvent {
                stream_name: stream_name.to_string(),
                stream_position,
                commit_position,
                topic: event.topic,
                data: event.data,
                metadata: event.metadata,
                recorded_at: Utc::now(),
            };
            stream_position += 1;
            last_commit_position = commit_position;
            state.log.push(recorded.clone());
            state
                .streams
                .entry(stream_name.to_string())
                .or_default()
                .push(recorded.clone());
            // Published while the write lock is held, so live feeds see
            // events in commit order.
            let _ = self.live_tx.send(recorded);
        }
        debug!(stream_name, last_commit_position, "appended batch");
        Ok(last_commit_position)
    }

    async fn read_stream(
        &self,
        stream_name: &str,
        start: Option<u64>,
        backwards: bool,
        limit: u64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        let state = self.state.read().await;
        let Some(stream) = state.streams.get(stream_name) else {
            return Err(StoreError::StreamNotFound(stream_name.to_string()));
        };
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let events = if backwards {
            stream
                .iter()
                .rev()
                .filter(|e| start.is_none_or(|s| e.stream_position <= s))
                .take(limit)
                .cloned()
                .collect()
        } else {
            stream
                .iter()
                .filter(|e| start.is_none_or(|s| e.stream_position >= s))
                .take(limit)
                .cloned()
                .collect()
        };
        Ok(events)
    }

    async fn read_all(
        &self,
        start: Option<u64>,
        filter: &ReadFilter,
        limit: u64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        let topic_filter = TopicFilter::compile(filter)?;
        let state = self.state.read().await;
        Ok(state
            .log
            .iter()
            .filter(|e| start.is_none_or(|s| e.commit_position >= s))
            .filter(|e| topic_filter.matches(&e.topic))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn get_current_version(&self, stream_name: &str) -> Result<Option<u64>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .streams
            .get(stream_name)
            .and_then(|s| s.last())
            .map(|e| e.stream_position))
    }

    async fn get_max_position(&self, filter: &ReadFilter) -> Result<Option<u64>, StoreError> {
        let topic_filter = TopicFilter::compile(filter)?;
        let state = self.state.read().await;
        Ok(state
            .log
            .iter()
            .rev()
            .find(|e| topic_filter.matches(&e.topic))
            .map(|e| e.commit_position))
    }

    async fn subscribe_all(
        &self,
        after: Option<u64>,
        filter: &ReadFilter,
    ) -> Result<LiveEventStream, StoreError> {
        let topic_filter = TopicFilter::compile(filter)?;

        // Holding the read lock blocks appends, so subscribing to the
        // broadcast and snapshotting the backlog is atomic: every event
        // is either in the backlog or will arrive on the receiver, never
        // both.
        let state = self.state.read().await;
        let mut live_rx = self.live_tx.subscribe();
        let backlog: Vec<RecordedEvent> = state
            .log
            .iter()
            .filter(|e| after.is_none_or(|a| e.commit_position > a))
            .filter(|e| topic_filter.matches(&e.topic))
            .cloned()
            .collect();
        drop(state);

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for event in backlog {
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
            }
            loop {
                match live_rx.recv().await {
                    Ok(event) => {
                        if after.is_some_and(|a| event.commit_position <= a) {
                            continue;
                        }
                        if !topic_filter.matches(&event.topic) {
                            continue;
                        }
                        if tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // The feed is dead after this, like a remote
                        // store dropping a slow consumer.
                        let _ = tx.send(Err(StoreError::ConsumerTooSlow)).await;
                        return;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
