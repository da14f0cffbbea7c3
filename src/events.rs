// Copyright 2025 Cowboy AI, LLC.

//! Adapter-internal event records
//!
//! [`StoredEvent`] is one domain event recorded against one stream;
//! [`Notification`] is its projection into the store's global order.
//! Both treat state as an opaque byte payload tagged with a topic string.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One domain event recorded against one stream. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// The stream this event belongs to
    pub originator_id: Uuid,

    /// Sequence number within the stream, contiguous and gapless starting
    /// at the configured initial version
    pub originator_version: u64,

    /// Topic string identifying the event type; never interpreted here
    pub topic: String,

    /// Opaque event state
    pub state: Bytes,
}

impl StoredEvent {
    /// The store-level stream name for this event's originator.
    pub fn stream_name(&self) -> String {
        self.originator_id.to_string()
    }
}

/// A [`StoredEvent`] as seen in the global notification feed.
///
/// `id` is the store's commit position at the time of the append: strictly
/// increasing across the whole store, so notification order is the store's
/// total order, not per-stream order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Global commit position of the underlying append
    pub id: u64,

    /// The stream the event belongs to
    pub originator_id: Uuid,

    /// Sequence number within the stream
    pub originator_version: u64,

    /// Topic string identifying the event type
    pub topic: String,

    /// Opaque event state
    pub state: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_is_the_uuid_string_form() {
        let id = Uuid::new_v4();
        let event = StoredEvent {
            originator_id: id,
            originator_version: 0,
            topic: "example:Opened".to_string(),
            state: Bytes::new(),
        };
        assert_eq!(event.stream_name(), id.to_string());
    }
}
