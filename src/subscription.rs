// Copyright 2025 Cowboy AI, LLC.

//! Live notification subscription
//!
//! A stateful, single-consumer iterator over the global notification
//! feed. When the store drops the live feed because the consumer fell
//! behind, the subscription reopens it at the last delivered position:
//! the caller sees neither duplicates nor gaps, and no error.

use crate::codec;
use crate::errors::{RecorderError, RecorderResult};
use crate::events::Notification;
use crate::store::{LiveEventStream, LogStore, ReadFilter, StoreError};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// A live, ordered tail of the notification feed.
///
/// Drive it with [`Subscription::next`] from exactly one task at a time.
/// Stopping is idempotent and may come from another task through a
/// [`StopHandle`]; a stopped subscription's `next` returns `None`
/// promptly, including for a pull already in progress.
pub struct Subscription {
    client: Arc<dyn LogStore>,
    filter: ReadFilter,
    initial_version: u64,
    last_notification_id: Option<u64>,
    stream: LiveEventStream,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Subscription {
    pub(crate) async fn start(
        client: Arc<dyn LogStore>,
        filter: ReadFilter,
        after: Option<u64>,
        initial_version: u64,
    ) -> RecorderResult<Self> {
        let stream = client
            .subscribe_all(after, &filter)
            .await
            .map_err(|source| RecorderError::Persistence { source })?;
        let (stop_tx, stop_rx) = watch::channel(false);
        debug!(?after, "subscription opened");
        Ok(Self {
            client,
            filter,
            initial_version,
            last_notification_id: after,
            stream,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        })
    }

    /// Pull the next notification.
    ///
    /// Returns `None` once stopped, or when the store ends the feed.
    /// Notifications arrive in non-decreasing id order; a
    /// consumer-too-slow drop from the store is recovered internally by
    /// resubscribing strictly after the last delivered id.
    pub async fn next(&mut self) -> Option<RecorderResult<Notification>> {
        loop {
            if *self.stop_rx.borrow() {
                return None;
            }
            let item = tokio::select! {
                _ = self.stop_rx.changed() => return None,
                item = self.stream.next() => item,
            };
            match item {
                None => return None,
                Some(Ok(event)) => match codec::to_notification(&event, self.initial_version) {
                    Ok(notification) => {
                        self.last_notification_id = Some(notification.id);
                        return Some(Ok(notification));
                    }
                    Err(e) => return Some(Err(e)),
                },
                Some(Err(StoreError::ConsumerTooSlow)) => {
                    // The store dropped the feed; resume where we left off.
                    info!(
                        last_notification_id = ?self.last_notification_id,
                        "live feed dropped, resubscribing"
                    );
                    match self
                        .client
                        .subscribe_all(self.last_notification_id, &self.filter)
                        .await
                    {
                        Ok(stream) => self.stream = stream,
                        Err(source) => {
                            return Some(Err(RecorderError::Persistence { source }));
                        }
                    }
                }
                Some(Err(source)) => {
                    return Some(Err(RecorderError::Persistence { source }));
                }
            }
        }
    }

    /// The id of the last delivered notification, or the starting
    /// position if nothing has been delivered yet.
    pub fn last_notification_id(&self) -> Option<u64> {
        self.last_notification_id
    }

    /// Stop the subscription. Idempotent.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// A handle for stopping this subscription from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .field("last_notification_id", &self.last_notification_id)
            .field("stopped", &*self.stop_rx.borrow())
            .finish_non_exhaustive()
    }
}

/// Stops a [`Subscription`] from any task. Cloneable; stopping twice is
/// harmless.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Stop the subscription.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}
