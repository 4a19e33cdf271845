//! Tests for the notarization log backends.

use rusqlite::Connection;
use tempfile::TempDir;

use super::*;

/// Helper to create a temporary on-disk ledger for testing.
fn temp_ledger() -> (SqliteLedger, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test_ledger.db");
    let ledger = SqliteLedger::open(&path, "0xpublisher").expect("failed to open ledger");
    (ledger, dir)
}

#[tokio::test]
async fn test_empty_ledger_fetches_nothing() {
    let ledger = SqliteLedger::in_memory("0xpublisher").expect("failed to create ledger");
    let records = ledger.fetch_all().await.expect("failed to fetch");
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_append_assigns_ledger_fields() {
    let (ledger, _dir) = temp_ledger();

    let record = ledger
        .append("dev-1", "v1.0", "aaaa")
        .await
        .expect("failed to append");

    assert_eq!(record.sender, "0xpublisher");
    assert_eq!(record.device_id, "dev-1");
    assert_eq!(record.firmware_version, "v1.0");
    assert_eq!(record.firmware_hash, "aaaa");
    assert_eq!(record.seq, 1);
    assert!(record.timestamp > 0);
}

#[tokio::test]
async fn test_publish_then_fetch_round_trips_content() {
    let (ledger, _dir) = temp_ledger();

    ledger
        .append("dev-1", "v1.0", "aaaa")
        .await
        .expect("failed to append");

    let records = ledger.fetch_all().await.expect("failed to fetch");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].device_id, "dev-1");
    assert_eq!(records[0].firmware_version, "v1.0");
    assert_eq!(records[0].firmware_hash, "aaaa");
    assert_eq!(records[0].sender, "0xpublisher");
}

#[tokio::test]
async fn test_fetch_preserves_append_order() {
    let (ledger, _dir) = temp_ledger();

    for (version, hash) in [("v1.0", "aaaa"), ("v1.1", "bbbb"), ("v1.2", "cccc")] {
        ledger
            .append("dev-1", version, hash)
            .await
            .expect("failed to append");
    }

    let records = ledger.fetch_all().await.expect("failed to fetch");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].seq, 1);
    assert_eq!(records[1].seq, 2);
    assert_eq!(records[2].seq, 3);
    assert_eq!(records[0].firmware_version, "v1.0");
    assert_eq!(records[2].firmware_version, "v1.2");
}

#[tokio::test]
async fn test_timestamps_non_decreasing() {
    let (ledger, _dir) = temp_ledger();

    for i in 0..5 {
        ledger
            .append("dev-1", &format!("v1.{i}"), "hash")
            .await
            .expect("failed to append");
    }

    let records = ledger.fetch_all().await.expect("failed to fetch");
    for pair in records.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn test_update_rejected_by_schema() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test_ledger.db");
    let ledger = SqliteLedger::open(&path, "0xpublisher").expect("failed to open ledger");

    ledger
        .append("dev-1", "v1.0", "aaaa")
        .await
        .expect("failed to append");
    drop(ledger);

    // Even a writer with raw access to the database cannot rewrite history.
    let conn = Connection::open(&path).expect("failed to reopen database");
    let result = conn.execute("UPDATE firmware_records SET firmware_hash = 'evil'", []);
    assert!(result.is_err(), "append-only trigger must reject UPDATE");
}

#[tokio::test]
async fn test_delete_rejected_by_schema() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test_ledger.db");
    let ledger = SqliteLedger::open(&path, "0xpublisher").expect("failed to open ledger");

    ledger
        .append("dev-1", "v1.0", "aaaa")
        .await
        .expect("failed to append");
    drop(ledger);

    let conn = Connection::open(&path).expect("failed to reopen database");
    let result = conn.execute("DELETE FROM firmware_records", []);
    assert!(result.is_err(), "append-only trigger must reject DELETE");
}

#[tokio::test]
async fn test_fetch_sees_appends_from_other_writers() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test_ledger.db");

    let reader = SqliteLedger::open(&path, "0xreader").expect("failed to open reader");
    let writer = SqliteLedger::open(&path, "0xwriter").expect("failed to open writer");

    assert!(reader.fetch_all().await.expect("failed to fetch").is_empty());

    writer
        .append("dev-1", "v1.0", "aaaa")
        .await
        .expect("failed to append");

    // No caching: the next fetch must observe the concurrent writer's
    // append, stamped with that writer's identity.
    let records = reader.fetch_all().await.expect("failed to fetch");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sender, "0xwriter");
}

#[tokio::test]
async fn test_memory_ledger_clock_never_steps_backwards() {
    let ticks = std::sync::Mutex::new(vec![100_u64, 50, 200].into_iter());
    let ledger = MemoryLedger::with_clock("mem", move || {
        ticks.lock().unwrap().next().expect("clock exhausted")
    });

    let first = ledger.append("dev-1", "v1", "a").await.expect("append");
    let second = ledger.append("dev-1", "v2", "b").await.expect("append");
    let third = ledger.append("dev-1", "v3", "c").await.expect("append");

    assert_eq!(first.timestamp, 100);
    assert_eq!(second.timestamp, 100, "backwards clock must be clamped");
    assert_eq!(third.timestamp, 200);
    assert_eq!((first.seq, second.seq, third.seq), (1, 2, 3));
}
