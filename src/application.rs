// Copyright 2025 Cowboy AI, LLC.

//! Application recorder
//!
//! Extends the aggregate recorder with the global notification log:
//! cursor-based pagination over the store's total order, topic filtering,
//! and live subscriptions. Events from internal/system streams and from
//! snapshot streams are excluded from the feed by construction.

use crate::aggregate::AggregateRecorder;
use crate::codec;
use crate::config::AdapterConfig;
use crate::errors::{RecorderError, RecorderResult};
use crate::events::{Notification, StoredEvent};
use crate::range::ReadRange;
use crate::store::{LogStore, ReadFilter};
use crate::subscription::Subscription;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Records events like [`AggregateRecorder`] while also exposing them
/// through the global notification feed.
#[derive(Debug, Clone)]
pub struct ApplicationRecorder {
    recorder: AggregateRecorder,
}

impl ApplicationRecorder {
    /// Create an application recorder.
    pub fn new(client: Arc<dyn LogStore>, config: AdapterConfig) -> Self {
        Self {
            recorder: AggregateRecorder::new(client, config),
        }
    }

    /// The underlying aggregate recorder.
    pub fn aggregate_recorder(&self) -> &AggregateRecorder {
        &self.recorder
    }

    fn config(&self) -> &AdapterConfig {
        self.recorder.config()
    }

    /// Append events to one stream; see [`AggregateRecorder::append`].
    /// The recorded events also become visible in the notification feed.
    pub async fn append(&self, stored_events: &[StoredEvent]) -> RecorderResult<Vec<u64>> {
        self.recorder.append(stored_events).await
    }

    /// Read a range of one stream's events; see
    /// [`AggregateRecorder::select_range`].
    pub async fn select_range(
        &self,
        originator_id: Uuid,
        range: &ReadRange,
    ) -> RecorderResult<Vec<StoredEvent>> {
        self.recorder.select_range(originator_id, range).await
    }

    fn notification_filter(&self, topics: &[String]) -> ReadFilter {
        ReadFilter {
            exclude: self.config().exclude_patterns.clone(),
            include: topics.iter().map(|t| regex::escape(t)).collect(),
        }
    }

    /// Read a page of the global notification feed.
    ///
    /// `start` is inclusive unless `inclusive_of_start` is false, in which
    /// case the notification at exactly `start` is dropped (the read limit
    /// is raised by one to compensate, so callers still see up to `limit`
    /// results). `stop` is inclusive. `topics`, if non-empty, restricts
    /// results to exactly those topic strings; the fixed exclusion
    /// patterns always apply and win priority.
    pub async fn select_notifications(
        &self,
        start: Option<u64>,
        limit: usize,
        stop: Option<u64>,
        topics: &[String],
        inclusive_of_start: bool,
    ) -> RecorderResult<Vec<Notification>> {
        let read_limit = if inclusive_of_start { limit } else { limit + 1 };
        let recorded = self
            .recorder
            .client()
            .read_all(start, &self.notification_filter(topics), read_limit as u64)
            .await
            .map_err(|source| RecorderError::Persistence { source })?;

        let mut notifications = Vec::with_capacity(recorded.len().min(limit));
        for event in recorded {
            // Maybe drop the first record.
            if !inclusive_of_start && start == Some(event.commit_position) {
                continue;
            }
            let commit_position = event.commit_position;
            notifications.push(codec::to_notification(&event, self.config().initial_version)?);

            // The caller's limit governs, in case we didn't drop the first.
            if notifications.len() == limit {
                break;
            }
            if stop.is_some_and(|s| commit_position >= s) {
                break;
            }
        }
        debug!(count = notifications.len(), "selected notifications");
        Ok(notifications)
    }

    /// The highest notification id in the feed, or `None` when the feed
    /// is empty. Taken with the fixed exclusion patterns applied, so it
    /// is a coherent "as-of" point for pagination and subscriptions.
    pub async fn max_notification_id(&self) -> RecorderResult<Option<u64>> {
        self.recorder
            .client()
            .get_max_position(&self.notification_filter(&[]))
            .await
            .map_err(|source| RecorderError::Persistence { source })
    }

    /// Open a live subscription to the notification feed, starting
    /// strictly after `after` (`None` means from the beginning).
    ///
    /// Topic filtering is fixed for the whole subscription and composes
    /// with the exclusion patterns; exclusions win priority.
    pub async fn subscribe(
        &self,
        after: Option<u64>,
        topics: &[String],
    ) -> RecorderResult<Subscription> {
        Subscription::start(
            Arc::clone(self.recorder.client()),
            self.notification_filter(topics),
            after,
            self.config().initial_version,
        )
        .await
    }
}
