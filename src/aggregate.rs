// Copyright 2025 Cowboy AI, LLC.

//! Aggregate recorder
//!
//! Per-originator append and range-read with optimistic concurrency
//! control and gapless versioning, including the snapshot-stream variant.
//! The recorder holds no internal locks; per-stream serialization comes
//! from the store's expected-version check.

use crate::codec;
use crate::config::AdapterConfig;
use crate::errors::{RecorderError, RecorderResult};
use crate::events::StoredEvent;
use crate::range::{self, ReadPlan, ReadRange};
use crate::store::{ExpectedVersion, LogStore, StoreError};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Records events of one aggregate at a time against the store.
///
/// In snapshotting mode the recorder writes to the derived snapshot
/// stream, accepts exactly one record per append, and replaces OCC with
/// an ordering guard that makes stale snapshot writes a no-op.
#[derive(Debug, Clone)]
pub struct AggregateRecorder {
    client: Arc<dyn LogStore>,
    config: AdapterConfig,
    for_snapshotting: bool,
}

impl AggregateRecorder {
    /// Create a recorder for ordinary event streams.
    pub fn new(client: Arc<dyn LogStore>, config: AdapterConfig) -> Self {
        Self {
            client,
            config,
            for_snapshotting: false,
        }
    }

    /// Create a recorder for snapshot streams.
    pub fn for_snapshotting(client: Arc<dyn LogStore>, config: AdapterConfig) -> Self {
        Self {
            client,
            config,
            for_snapshotting: true,
        }
    }

    pub(crate) fn client(&self) -> &Arc<dyn LogStore> {
        &self.client
    }

    /// The recorder's configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn stream_name_for(&self, originator_id: Uuid) -> String {
        let stream_name = originator_id.to_string();
        if self.for_snapshotting {
            self.config.snapshot_stream_name(&stream_name)
        } else {
            stream_name
        }
    }

    /// Append a contiguous batch of events to one stream, returning the
    /// call's commit position replicated once per input event.
    ///
    /// The store reports only one commit position per append call, so
    /// callers must not assume one distinct position per event in
    /// multi-event batches. An empty batch returns an empty result with
    /// no network call. A snapshot older than the recorded latest is
    /// skipped, also returning an empty result.
    pub async fn append(&self, stored_events: &[StoredEvent]) -> RecorderResult<Vec<u64>> {
        if stored_events.is_empty() {
            return Ok(Vec::new());
        }

        if self.for_snapshotting {
            if stored_events.len() != 1 {
                return Err(RecorderError::Validation(
                    "snapshots are recorded one at a time".to_string(),
                ));
            }
            // Protect against appending an old snapshot after a new one:
            // OCC is disabled on the snapshot stream, so this read-first
            // guard is the only ordering protection.
            let event = &stored_events[0];
            let latest = self
                .select_range(event.originator_id, &ReadRange::latest(1))
                .await?;
            if latest
                .first()
                .is_some_and(|s| s.originator_version > event.originator_version)
            {
                debug!(
                    originator_id = %event.originator_id,
                    originator_version = event.originator_version,
                    "skipping stale snapshot"
                );
                return Ok(Vec::new());
            }
        } else {
            let first = &stored_events[0];
            if stored_events
                .iter()
                .any(|e| e.originator_id != first.originator_id)
            {
                return Err(RecorderError::Validation(
                    "the store can't atomically record events in more than one stream".to_string(),
                ));
            }
            for (i, event) in stored_events.iter().enumerate().skip(1) {
                if event.originator_version != first.originator_version + i as u64 {
                    return Err(RecorderError::Validation(
                        "gap detected in originator versions".to_string(),
                    ));
                }
            }
        }

        let new_events = stored_events
            .iter()
            .map(|e| codec::to_new_event(e, self.for_snapshotting))
            .collect::<Result<Vec<_>, _>>()?;

        let stream_name = self.stream_name_for(stored_events[0].originator_id);
        let expected = self.expected_version(stored_events[0].originator_version)?;

        debug!(
            stream_name = %stream_name,
            %expected,
            count = new_events.len(),
            "appending events"
        );
        let commit_position = self
            .client
            .append(&stream_name, expected, new_events)
            .await?;
        Ok(vec![commit_position; stored_events.len()])
    }

    fn expected_version(&self, first_version: u64) -> RecorderResult<ExpectedVersion> {
        if self.for_snapshotting {
            // The read-first guard above is the only ordering protection.
            return Ok(ExpectedVersion::Any);
        }
        let position = first_version
            .checked_sub(self.config.initial_version)
            .ok_or_else(|| {
                RecorderError::Validation(format!(
                    "originator version {first_version} precedes the initial version {}",
                    self.config.initial_version
                ))
            })?;
        Ok(match position {
            0 => ExpectedVersion::NoStream,
            p => ExpectedVersion::Exact(p - 1),
        })
    }

    /// Read a range of one stream's events.
    ///
    /// A nonexistent stream yields an empty result, not an error. For
    /// snapshot streams, `desc` combined with a nonzero `lte` resolves to
    /// empty, and the domain version is recovered from the metadata
    /// envelope.
    pub async fn select_range(
        &self,
        originator_id: Uuid,
        range: &ReadRange,
    ) -> RecorderResult<Vec<StoredEvent>> {
        if self.for_snapshotting && range.desc && range.lte.is_some_and(|l| l > 0) {
            return Ok(Vec::new());
        }
        let stream_name = self.stream_name_for(originator_id);

        let head = if range::needs_head(range) {
            match self.client.get_current_version(&stream_name).await {
                Ok(position) => position.map(|p| p + self.config.initial_version),
                Err(StoreError::StreamNotFound(_)) => None,
                Err(e) => return Err(RecorderError::Persistence { source: e }),
            }
        } else {
            None
        };

        let plan = range::resolve(range, self.config.initial_version, head);
        let recorded = match plan {
            ReadPlan::Empty => return Ok(Vec::new()),
            ReadPlan::Read {
                start,
                backwards,
                limit,
            } => {
                match self
                    .client
                    .read_stream(&stream_name, start, backwards, limit.unwrap_or(u64::MAX))
                    .await
                {
                    Ok(events) => events,
                    Err(StoreError::StreamNotFound(_)) => return Ok(Vec::new()),
                    Err(e) => return Err(RecorderError::Persistence { source: e }),
                }
            }
        };

        recorded
            .iter()
            .map(|r| {
                codec::to_stored_event(
                    r,
                    originator_id,
                    self.for_snapshotting,
                    self.config.initial_version,
                )
            })
            .collect()
    }
}
