// Copyright 2025 Cowboy AI, LLC.

//! Stream codec
//!
//! Pure, stateless conversions between the adapter's internal records and
//! the wire event representation. The snapshot's domain version rides in
//! an explicit metadata envelope ([`SnapshotMetadata`]) because the
//! snapshot stream's own sequence number cannot serve as the domain
//! version.

use crate::errors::{RecorderError, RecorderResult};
use crate::events::{Notification, StoredEvent};
use crate::store::{NewEvent, RecordedEvent};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content type tagged onto every proposed event.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Metadata envelope recorded alongside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// The snapshotted aggregate's domain version
    pub originator_version: u64,
}

/// Convert an internal event record into wire form.
pub fn to_new_event(event: &StoredEvent, for_snapshotting: bool) -> RecorderResult<NewEvent> {
    let metadata = if for_snapshotting {
        let envelope = SnapshotMetadata {
            originator_version: event.originator_version,
        };
        Bytes::from(
            serde_json::to_vec(&envelope)
                .map_err(|e| RecorderError::Serialization(e.to_string()))?,
        )
    } else {
        Bytes::new()
    };
    Ok(NewEvent {
        topic: event.topic.clone(),
        data: event.state.clone(),
        metadata,
        content_type: CONTENT_TYPE_OCTET_STREAM.to_string(),
    })
}

/// Convert a recorded wire event back into an internal event record.
///
/// For snapshot records the domain version is recovered from the metadata
/// envelope; otherwise it is the stream position shifted by the configured
/// initial version.
pub fn to_stored_event(
    recorded: &RecordedEvent,
    originator_id: Uuid,
    for_snapshotting: bool,
    initial_version: u64,
) -> RecorderResult<StoredEvent> {
    let originator_version = if for_snapshotting {
        let envelope: SnapshotMetadata =
            serde_json::from_slice(&recorded.metadata).map_err(|e| {
                RecorderError::Serialization(format!(
                    "snapshot metadata for stream {:?}: {e}",
                    recorded.stream_name
                ))
            })?;
        envelope.originator_version
    } else {
        recorded.stream_position + initial_version
    };
    Ok(StoredEvent {
        originator_id,
        originator_version,
        topic: recorded.topic.clone(),
        state: recorded.data.clone(),
    })
}

/// Project a recorded wire event into the global notification feed.
///
/// The stream name must parse as an originator id; a failure is surfaced
/// naming the offending value, never swallowed.
pub fn to_notification(
    recorded: &RecordedEvent,
    initial_version: u64,
) -> RecorderResult<Notification> {
    let originator_id = Uuid::parse_str(&recorded.stream_name).map_err(|source| {
        RecorderError::InvalidStreamName {
            stream_name: recorded.stream_name.clone(),
            source,
        }
    })?;
    Ok(Notification {
        id: recorded.commit_position,
        originator_id,
        originator_version: recorded.stream_position + initial_version,
        topic: recorded.topic.clone(),
        state: recorded.data.clone(),
    })
}
