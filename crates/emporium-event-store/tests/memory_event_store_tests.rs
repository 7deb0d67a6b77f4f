//! Integration tests for `InMemoryEventStore`.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use emporium_core::error::DomainError;
use emporium_core::event::EventMetadata;
use emporium_core::store::{EventStore, NewEvent, TimeRange};
use emporium_event_store::InMemoryEventStore;
use uuid::Uuid;

/// Helper to build a `NewEvent` with sensible defaults.
fn make_event(aggregate_id: Uuid) -> NewEvent {
    NewEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: "catalog.test_event".to_string(),
        event_version: 1,
        payload: serde_json::json!({"key": "value"}),
        metadata: EventMetadata::default(),
        occurred_at: Utc::now(),
    }
}

// --- read_stream ---

#[tokio::test]
async fn test_read_stream_returns_empty_vec_for_nonexistent_aggregate() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();

    let events = store.read_stream(aggregate_id, 0).await.unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn test_read_stream_skips_versions_at_or_below_from_version() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();
    let events = vec![
        make_event(aggregate_id),
        make_event(aggregate_id),
        make_event(aggregate_id),
    ];
    store.append("product", aggregate_id, 0, events).await.unwrap();

    let loaded = store.read_stream(aggregate_id, 2).await.unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].aggregate_version, 3);
}

// --- append ---

#[tokio::test]
async fn test_append_assigns_contiguous_versions_in_submitted_order() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();
    let events = vec![
        make_event(aggregate_id),
        make_event(aggregate_id),
        make_event(aggregate_id),
    ];
    let submitted_ids: Vec<Uuid> = events.iter().map(|e| e.event_id).collect();

    let new_version = store.append("product", aggregate_id, 0, events).await.unwrap();

    assert_eq!(new_version, 3);
    let loaded = store.read_stream(aggregate_id, 0).await.unwrap();
    assert_eq!(loaded.len(), 3);
    for (i, event) in loaded.iter().enumerate() {
        assert_eq!(event.aggregate_version, i64::try_from(i + 1).unwrap());
        assert_eq!(event.event_id, submitted_ids[i]);
    }
}

#[tokio::test]
async fn test_append_continues_version_sequence_across_batches() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();
    store
        .append(
            "product",
            aggregate_id,
            0,
            vec![make_event(aggregate_id), make_event(aggregate_id)],
        )
        .await
        .unwrap();

    let new_version = store
        .append("product", aggregate_id, 2, vec![make_event(aggregate_id)])
        .await
        .unwrap();

    assert_eq!(new_version, 3);
    let loaded = store.read_stream(aggregate_id, 0).await.unwrap();
    let versions: Vec<i64> = loaded.iter().map(|e| e.aggregate_version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_append_with_stale_expected_version_fails_without_writing() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();
    store
        .append(
            "product",
            aggregate_id,
            0,
            vec![make_event(aggregate_id), make_event(aggregate_id)],
        )
        .await
        .unwrap();

    let result = store
        .append(
            "product",
            aggregate_id,
            0,
            vec![make_event(aggregate_id), make_event(aggregate_id)],
        )
        .await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id: conflict_id,
            expected,
            actual,
        }) => {
            assert_eq!(conflict_id, aggregate_id);
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    // The losing batch must not be visible.
    let loaded = store.read_stream(aggregate_id, 0).await.unwrap();
    assert_eq!(loaded.len(), 2);
}

#[tokio::test]
async fn test_append_rejects_batch_mixing_aggregates_before_any_write() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();
    let other_aggregate = Uuid::new_v4();
    let events = vec![make_event(aggregate_id), make_event(other_aggregate)];

    let result = store.append("product", aggregate_id, 0, events).await;

    assert!(matches!(result, Err(DomainError::InvalidEventBatch(_))));
    assert_eq!(store.stream_version(aggregate_id).await.unwrap(), 0);
    let loaded = store.read_stream(aggregate_id, 0).await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn test_append_empty_batch_is_noop() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();

    let version = store.append("product", aggregate_id, 0, vec![]).await.unwrap();

    assert_eq!(version, 0);
    assert_eq!(store.stream_version(aggregate_id).await.unwrap(), 0);
}

// --- concurrency ---

#[tokio::test]
async fn test_concurrent_appends_to_fresh_aggregate_exactly_one_wins() {
    let store = Arc::new(InMemoryEventStore::new());
    let aggregate_id = Uuid::new_v4();

    let store_a = Arc::clone(&store);
    let store_b = Arc::clone(&store);
    let task_a = tokio::spawn(async move {
        store_a
            .append("product", aggregate_id, 0, vec![make_event(aggregate_id)])
            .await
    });
    let task_b = tokio::spawn(async move {
        store_b
            .append("product", aggregate_id, 0, vec![make_event(aggregate_id)])
            .await
    });

    let result_a = task_a.await.unwrap();
    let result_b = task_b.await.unwrap();

    let (winner, loser) = if result_a.is_ok() {
        (result_a, result_b)
    } else {
        (result_b, result_a)
    };
    assert_eq!(winner.unwrap(), 1);
    match loser {
        Err(DomainError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(store.stream_version(aggregate_id).await.unwrap(), 1);
}

// --- global feed ---

#[tokio::test]
async fn test_read_all_orders_by_global_sequence_across_streams() {
    let store = InMemoryEventStore::new();
    let agg_a = Uuid::new_v4();
    let agg_b = Uuid::new_v4();
    store.append("product", agg_a, 0, vec![make_event(agg_a)]).await.unwrap();
    store.append("product", agg_b, 0, vec![make_event(agg_b)]).await.unwrap();
    store.append("product", agg_a, 1, vec![make_event(agg_a)]).await.unwrap();

    let all = store.read_all(0, 100).await.unwrap();

    let sequences: Vec<i64> = all.iter().map(|e| e.global_sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(all[0].aggregate_id, agg_a);
    assert_eq!(all[1].aggregate_id, agg_b);
    assert_eq!(all[2].aggregate_id, agg_a);
}

#[tokio::test]
async fn test_read_all_respects_after_sequence_and_limit() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();
    let events: Vec<NewEvent> = (0..5).map(|_| make_event(aggregate_id)).collect();
    store.append("product", aggregate_id, 0, events).await.unwrap();

    let batch = store.read_all(1, 2).await.unwrap();

    let sequences: Vec<i64> = batch.iter().map(|e| e.global_sequence).collect();
    assert_eq!(sequences, vec![2, 3]);
}

// --- audit queries ---

#[tokio::test]
async fn test_query_by_type_filters_on_type_and_time_range() {
    let store = InMemoryEventStore::new();
    let aggregate_id = Uuid::new_v4();
    let early = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

    let mut first = make_event(aggregate_id);
    first.event_type = "catalog.price_changed".to_string();
    first.occurred_at = early;
    let mut second = make_event(aggregate_id);
    second.event_type = "catalog.price_changed".to_string();
    second.occurred_at = late;
    let mut third = make_event(aggregate_id);
    third.event_type = "catalog.product_registered".to_string();
    third.occurred_at = late;
    store
        .append("product", aggregate_id, 0, vec![first, second, third])
        .await
        .unwrap();

    let range = TimeRange {
        from: Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
        until: None,
    };
    let matches = store.query_by_type("catalog.price_changed", range).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].occurred_at, late);
}

#[tokio::test]
async fn test_query_by_correlation_id_spans_streams() {
    let store = InMemoryEventStore::new();
    let agg_a = Uuid::new_v4();
    let agg_b = Uuid::new_v4();
    let correlation_id = Uuid::new_v4();

    let mut event_a = make_event(agg_a);
    event_a.metadata = EventMetadata::correlated(correlation_id);
    let mut event_b = make_event(agg_b);
    event_b.metadata = EventMetadata::correlated(correlation_id);
    store.append("product", agg_a, 0, vec![event_a]).await.unwrap();
    store.append("product", agg_b, 0, vec![event_b]).await.unwrap();
    store.append("product", agg_a, 1, vec![make_event(agg_a)]).await.unwrap();

    let matches = store.query_by_correlation_id(correlation_id).await.unwrap();

    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|e| e.metadata.correlation_id == Some(correlation_id)));
}

// --- stream_version ---

#[tokio::test]
async fn test_stream_version_is_zero_for_missing_stream() {
    let store = InMemoryEventStore::new();

    let version = store.stream_version(Uuid::new_v4()).await.unwrap();

    assert_eq!(version, 0);
}
