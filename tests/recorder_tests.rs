// Copyright 2025 Cowboy AI, LLC.

//! Integration tests for the aggregate recorder against the in-memory store

use async_trait::async_trait;
use bytes::Bytes;
use eventstore_adapter::{
    AdapterConfig, AggregateRecorder, ExpectedVersion, InMemoryLogStore, LiveEventStream,
    LogStore, NewEvent, ReadFilter, ReadRange, RecordedEvent, RecorderError, StoreError,
    StoredEvent,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio_test::assert_ok;
use uuid::Uuid;

fn event(id: Uuid, version: u64, topic: &str) -> StoredEvent {
    StoredEvent {
        originator_id: id,
        originator_version: version,
        topic: topic.to_string(),
        state: Bytes::from(format!("{{\"v\":{version}}}")),
    }
}

fn recorder() -> AggregateRecorder {
    AggregateRecorder::new(Arc::new(InMemoryLogStore::new()), AdapterConfig::default())
}

#[tokio::test]
async fn appended_events_come_back_in_order() {
    let recorder = recorder();
    let id = Uuid::new_v4();
    let events: Vec<_> = (0..5).map(|v| event(id, v, "account:Event")).collect();
    recorder.append(&events).await.unwrap();

    let read = recorder.select_range(id, &ReadRange::all()).await.unwrap();
    assert_eq!(read, events);
}

#[tokio::test]
async fn missing_stream_reads_empty() {
    let read = recorder()
        .select_range(Uuid::new_v4(), &ReadRange::all())
        .await
        .unwrap();
    assert!(read.is_empty());
}

#[tokio::test]
async fn wrong_head_append_conflicts_and_leaves_the_stream_unchanged() {
    let recorder = recorder();
    let id = Uuid::new_v4();
    recorder
        .append(&[event(id, 0, "t"), event(id, 1, "t")])
        .await
        .unwrap();

    // Not head+1: someone else already wrote version 1.
    let err = recorder.append(&[event(id, 1, "t")]).await.unwrap_err();
    assert!(err.is_conflict());

    // Re-creating an existing stream conflicts too.
    let err = recorder.append(&[event(id, 0, "t")]).await.unwrap_err();
    assert!(err.is_conflict());

    // Skipping ahead conflicts.
    let err = recorder.append(&[event(id, 5, "t")]).await.unwrap_err();
    assert!(err.is_conflict());

    let read = recorder.select_range(id, &ReadRange::all()).await.unwrap();
    assert_eq!(read.len(), 2);
}

#[tokio::test]
async fn racing_appends_admit_exactly_one_writer() {
    let store = Arc::new(InMemoryLogStore::new());
    let a = AggregateRecorder::new(store.clone(), AdapterConfig::default());
    let b = AggregateRecorder::new(store, AdapterConfig::default());
    let id = Uuid::new_v4();
    a.append(&[event(id, 0, "t")]).await.unwrap();

    let ea = [event(id, 1, "t")];
    let eb = [event(id, 1, "t")];
    let (ra, rb) = tokio::join!(a.append(&ea), b.append(&eb));
    let winners = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = if ra.is_err() { ra } else { rb };
    assert!(loser.unwrap_err().is_conflict());
}

#[tokio::test]
async fn ascending_range_respects_bounds_and_limit() {
    let recorder = recorder();
    let id = Uuid::new_v4();
    let events: Vec<_> = (0..10).map(|v| event(id, v, "t")).collect();
    recorder.append(&events).await.unwrap();

    let read = recorder
        .select_range(
            id,
            &ReadRange {
                gt: Some(2),
                lte: Some(7),
                limit: Some(100),
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    let versions: Vec<u64> = read.iter().map(|e| e.originator_version).collect();
    assert_eq!(versions, vec![3, 4, 5, 6, 7]);

    let read = recorder
        .select_range(
            id,
            &ReadRange {
                gt: Some(2),
                lte: Some(7),
                limit: Some(2),
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    let versions: Vec<u64> = read.iter().map(|e| e.originator_version).collect();
    assert_eq!(versions, vec![3, 4]);

    // Empty span resolves without touching the store.
    let read = recorder
        .select_range(
            id,
            &ReadRange {
                gt: Some(7),
                lte: Some(7),
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    assert!(read.is_empty());
}

#[tokio::test]
async fn descending_gt_returns_newer_events_newest_first() {
    let recorder = recorder();
    let id = Uuid::new_v4();
    let events: Vec<_> = (0..6).map(|v| event(id, v, "t")).collect();
    recorder.append(&events).await.unwrap();

    let read = recorder
        .select_range(
            id,
            &ReadRange {
                gt: Some(2),
                desc: true,
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    let versions: Vec<u64> = read.iter().map(|e| e.originator_version).collect();
    assert_eq!(versions, vec![5, 4, 3]);

    // A missing stream is empty even though resolution needs its head.
    let read = recorder
        .select_range(
            Uuid::new_v4(),
            &ReadRange {
                gt: Some(2),
                desc: true,
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    assert!(read.is_empty());
}

#[tokio::test]
async fn descending_lte_clamps_to_the_head() {
    let recorder = recorder();
    let id = Uuid::new_v4();
    let events: Vec<_> = (0..4).map(|v| event(id, v, "t")).collect();
    recorder.append(&events).await.unwrap();

    let read = recorder
        .select_range(
            id,
            &ReadRange {
                lte: Some(100),
                desc: true,
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    let versions: Vec<u64> = read.iter().map(|e| e.originator_version).collect();
    assert_eq!(versions, vec![3, 2, 1, 0]);
}

#[tokio::test]
async fn nonzero_initial_version_round_trips() {
    let config = AdapterConfig {
        initial_version: 1,
        ..AdapterConfig::default()
    };
    let recorder = AggregateRecorder::new(Arc::new(InMemoryLogStore::new()), config);
    let id = Uuid::new_v4();
    let events: Vec<_> = (1..4).map(|v| event(id, v, "t")).collect();
    recorder.append(&events).await.unwrap();

    let read = recorder.select_range(id, &ReadRange::all()).await.unwrap();
    assert_eq!(read, events);

    let read = recorder
        .select_range(
            id,
            &ReadRange {
                gt: Some(1),
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    let versions: Vec<u64> = read.iter().map(|e| e.originator_version).collect();
    assert_eq!(versions, vec![2, 3]);
}

#[tokio::test]
async fn stale_snapshot_write_is_a_no_op() {
    let store = Arc::new(InMemoryLogStore::new());
    let snapshots =
        AggregateRecorder::for_snapshotting(store, AdapterConfig::default());
    let id = Uuid::new_v4();

    let positions = snapshots
        .append(&[event(id, 5, "account:Snapshot")])
        .await
        .unwrap();
    assert_eq!(positions.len(), 1);

    // An older snapshot arriving late is skipped without failing.
    let positions = snapshots
        .append(&[event(id, 3, "account:Snapshot")])
        .await
        .unwrap();
    assert!(positions.is_empty());

    let latest = snapshots.select_range(id, &ReadRange::latest(1)).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].originator_version, 5);

    // A newer one is recorded and becomes the latest.
    snapshots
        .append(&[event(id, 7, "account:Snapshot")])
        .await
        .unwrap();
    let latest = snapshots.select_range(id, &ReadRange::latest(1)).await.unwrap();
    assert_eq!(latest[0].originator_version, 7);
}

#[tokio::test]
async fn snapshot_descending_bounded_above_reads_empty() {
    let store = Arc::new(InMemoryLogStore::new());
    let snapshots =
        AggregateRecorder::for_snapshotting(store, AdapterConfig::default());
    let id = Uuid::new_v4();
    snapshots
        .append(&[event(id, 5, "account:Snapshot")])
        .await
        .unwrap();

    let read = snapshots
        .select_range(
            id,
            &ReadRange {
                lte: Some(9),
                desc: true,
                ..ReadRange::default()
            },
        )
        .await
        .unwrap();
    assert!(read.is_empty());
}

#[tokio::test]
async fn snapshot_versions_survive_the_metadata_envelope() {
    let store = Arc::new(InMemoryLogStore::new());
    let snapshots =
        AggregateRecorder::for_snapshotting(store, AdapterConfig::default());
    let id = Uuid::new_v4();
    // The snapshot stream's own sequence starts at zero regardless of the
    // domain version; the domain version must come back intact.
    snapshots
        .append(&[event(id, 42, "account:Snapshot")])
        .await
        .unwrap();
    let latest = snapshots.select_range(id, &ReadRange::latest(1)).await.unwrap();
    assert_eq!(latest[0].originator_version, 42);
}

#[tokio::test]
async fn snapshot_streams_do_not_collide_with_event_streams() {
    let store = Arc::new(InMemoryLogStore::new());
    let events_recorder = AggregateRecorder::new(store.clone(), AdapterConfig::default());
    let snapshots = AggregateRecorder::for_snapshotting(store, AdapterConfig::default());
    let id = Uuid::new_v4();

    events_recorder
        .append(&[event(id, 0, "account:Opened"), event(id, 1, "account:Credited")])
        .await
        .unwrap();
    snapshots
        .append(&[event(id, 1, "account:Snapshot")])
        .await
        .unwrap();

    let read = events_recorder.select_range(id, &ReadRange::all()).await.unwrap();
    let topics: Vec<&str> = read.iter().map(|e| e.topic.as_str()).collect();
    assert_eq!(topics, vec!["account:Opened", "account:Credited"]);
}

/// A store that cannot be reached at all.
#[derive(Debug)]
struct UnreachableStore;

#[async_trait]
impl LogStore for UnreachableStore {
    async fn append(
        &self,
        _stream_name: &str,
        _expected: ExpectedVersion,
        _events: Vec<NewEvent>,
    ) -> Result<u64, StoreError> {
        Err(StoreError::ConnectionError("connection refused".to_string()))
    }

    async fn read_stream(
        &self,
        _stream_name: &str,
        _start: Option<u64>,
        _backwards: bool,
        _limit: u64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        Err(StoreError::ConnectionError("connection refused".to_string()))
    }

    async fn read_all(
        &self,
        _start: Option<u64>,
        _filter: &ReadFilter,
        _limit: u64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        Err(StoreError::ConnectionError("connection refused".to_string()))
    }

    async fn get_current_version(&self, _stream_name: &str) -> Result<Option<u64>, StoreError> {
        Err(StoreError::ConnectionError("connection refused".to_string()))
    }

    async fn get_max_position(&self, _filter: &ReadFilter) -> Result<Option<u64>, StoreError> {
        Err(StoreError::ConnectionError("connection refused".to_string()))
    }

    async fn subscribe_all(
        &self,
        _after: Option<u64>,
        _filter: &ReadFilter,
    ) -> Result<LiveEventStream, StoreError> {
        Err(StoreError::ConnectionError("connection refused".to_string()))
    }
}

#[tokio::test]
async fn store_failures_surface_as_persistence_not_conflict() {
    let recorder =
        AggregateRecorder::new(Arc::new(UnreachableStore), AdapterConfig::default());
    let id = Uuid::new_v4();

    let err = recorder.append(&[event(id, 0, "t")]).await.unwrap_err();
    assert!(matches!(err, RecorderError::Persistence { .. }));
    assert!(!err.is_conflict());

    let err = recorder
        .select_range(id, &ReadRange::all())
        .await
        .unwrap_err();
    assert!(matches!(err, RecorderError::Persistence { .. }));
}

#[tokio::test]
async fn error_taxonomy_is_stable() {
    let recorder = recorder();
    let id = Uuid::new_v4();

    let gap = recorder
        .append(&[event(id, 0, "t"), event(id, 2, "t")])
        .await
        .unwrap_err();
    assert!(matches!(gap, RecorderError::Validation(_)));

    tokio_test::assert_ok!(recorder.append(&[event(id, 0, "t")]).await);
    let conflict = recorder.append(&[event(id, 0, "t")]).await.unwrap_err();
    assert!(matches!(conflict, RecorderError::Conflict { .. }));
}
