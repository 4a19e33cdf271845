//! `SQLite`-backed status store.
//!
//! One row per owner identity with upsert semantics: under WAL mode the
//! per-row write is atomic, which gives per-identity linearizability
//! without any in-process lock ordering across identities.

#![allow(clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use tracing::warn;

use super::{StatusStore, StatusStoreError};
use crate::telemetry::{coerce_partition_health, CoercionMode, DeviceStatusRecord};

const SCHEMA_SQL: &str = "
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

CREATE TABLE IF NOT EXISTS device_status (
    owner_identity TEXT PRIMARY KEY,
    record TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (unixepoch())
);
";

/// Durable latest-status-per-identity store.
///
/// Records are stored as canonical JSON. Rows are re-normalized leniently
/// on read so that data written by older writers can never fail a query.
pub struct SqliteStatusStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatusStore {
    /// Opens or creates a status store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns [`StatusStoreError::Storage`] if the database cannot be
    /// opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StatusStoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(StatusStoreError::storage)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(StatusStoreError::storage)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory status store for testing.
    ///
    /// # Errors
    ///
    /// Returns [`StatusStoreError::Storage`] if the database cannot be
    /// initialized.
    pub fn in_memory() -> Result<Self, StatusStoreError> {
        let conn = Connection::open_in_memory().map_err(StatusStoreError::storage)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(StatusStoreError::storage)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl StatusStore for SqliteStatusStore {
    fn put(&self, record: &DeviceStatusRecord) -> Result<(), StatusStoreError> {
        let json = serde_json::to_string(record).map_err(StatusStoreError::storage)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO device_status (owner_identity, record, updated_at)
             VALUES (?1, ?2, unixepoch())
             ON CONFLICT(owner_identity) DO UPDATE SET
                 record = excluded.record,
                 updated_at = excluded.updated_at",
            params![record.owner_identity, json],
        )
        .map_err(StatusStoreError::storage)?;

        Ok(())
    }

    fn get_latest(
        &self,
        owner_identity: &str,
    ) -> Result<Option<DeviceStatusRecord>, StatusStoreError> {
        let conn = self.conn.lock().unwrap();

        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM device_status WHERE owner_identity = ?1",
                params![owner_identity],
                |row| row.get(0),
            )
            .optional()
            .map_err(StatusStoreError::storage)?;

        Ok(json.map(|json| recover_record(owner_identity, &json)))
    }
}

/// Rebuilds a stored record leniently: the read path must never fail on
/// data the store previously accepted, whatever writer produced it.
/// Unparsable partition entries degrade to 0, missing strings to empty.
fn recover_record(owner_identity: &str, json: &str) -> DeviceStatusRecord {
    let value: Value = serde_json::from_str(json).unwrap_or_else(|err| {
        warn!(owner_identity, %err, "stored status row is not valid JSON");
        Value::Null
    });

    let string = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let received_at = value
        .get("received_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or_else(DateTime::<Utc>::default, |dt| dt.with_timezone(&Utc));

    DeviceStatusRecord {
        device_id: string("device_id"),
        device_name: string("device_name"),
        firmware_version: string("firmware_version"),
        manufacturer_id: string("manufacturer_id"),
        wallet_id: string("wallet_id"),
        owner_identity: owner_identity.to_string(),
        hash: string("hash"),
        status_info: string("status_info"),
        partition_health: coerce_partition_health(
            value.get("partition_health"),
            CoercionMode::Readback,
        )
        .unwrap_or_default(),
        received_at,
    }
}
