//! `SQLite`-backed notarization log.
//!
//! Uses WAL mode so reads stay concurrent while a write is in progress.
//! Append-only semantics are enforced at the schema level: `BEFORE UPDATE`
//! and `BEFORE DELETE` triggers abort any retroactive edit, so even a
//! writer holding the raw connection cannot rewrite history.

// SQLite returns i64 for row IDs and timestamps, but both are always
// non-negative here. Mutex poisoning indicates a panic in another thread,
// which is unrecoverable.
#![allow(clippy::cast_sign_loss, clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use tracing::debug;

use super::backend::{Ledger, LedgerError};
use crate::record::FirmwareRecord;

/// Schema for the firmware notarization log.
///
/// `seq` is the append ordinal; `timestamp` is UTC epoch seconds assigned
/// by [`SqliteLedger::append`]. The triggers make the table append-only.
const SCHEMA_SQL: &str = "
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

CREATE TABLE IF NOT EXISTS firmware_records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    device_id TEXT NOT NULL,
    firmware_version TEXT NOT NULL,
    firmware_hash TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_firmware_records_device
    ON firmware_records(device_id);

CREATE TRIGGER IF NOT EXISTS firmware_records_no_update
BEFORE UPDATE ON firmware_records
BEGIN
    SELECT RAISE(ABORT, 'firmware log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS firmware_records_no_delete
BEFORE DELETE ON firmware_records
BEGIN
    SELECT RAISE(ABORT, 'firmware log is append-only');
END;
";

/// The append-only firmware notarization log backed by `SQLite`.
///
/// Records are stored with monotonically increasing sequence numbers and
/// can never be modified or deleted. The configured `sender` identity is
/// stamped on every record this writer appends; other processes may append
/// to the same database file concurrently under their own identity.
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    sender: String,
}

impl SqliteLedger {
    /// Opens or creates a notarization log at the specified path.
    ///
    /// If the database doesn't exist, it is created with the appropriate
    /// schema. WAL mode is enabled for concurrent reads.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the database cannot be
    /// opened or initialized.
    pub fn open(path: impl AsRef<Path>, sender: impl Into<String>) -> Result<Self, LedgerError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_error)?;

        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sender: sender.into(),
        })
    }

    /// Creates an in-memory notarization log for testing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the database cannot be
    /// initialized.
    pub fn in_memory(sender: impl Into<String>) -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(open_error)?;
        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sender: sender.into(),
        })
    }

    fn initialize_connection(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute_batch(SCHEMA_SQL).map_err(open_error)
    }

    /// Highest timestamp in the log, or 0 if empty. Used to keep assigned
    /// timestamps non-decreasing even if the system clock steps backwards.
    fn last_timestamp(conn: &Connection) -> Result<u64, rusqlite::Error> {
        conn.query_row(
            "SELECT COALESCE(MAX(timestamp), 0) FROM firmware_records",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|ts| ts as u64)
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn append(
        &self,
        device_id: &str,
        firmware_version: &str,
        firmware_hash: &str,
    ) -> Result<FirmwareRecord, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let timestamp = Self::last_timestamp(&conn)
            .map_err(write_error)?
            .max(now);

        conn.execute(
            "INSERT INTO firmware_records (sender, device_id, firmware_version, firmware_hash, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.sender,
                device_id,
                firmware_version,
                firmware_hash,
                timestamp,
            ],
        )
        .map_err(write_error)?;

        let seq = conn.last_insert_rowid() as u64;
        debug!(device_id, seq, timestamp, "appended firmware record");

        Ok(FirmwareRecord {
            sender: self.sender.clone(),
            device_id: device_id.to_string(),
            firmware_version: firmware_version.to_string(),
            firmware_hash: firmware_hash.to_string(),
            timestamp,
            seq,
        })
    }

    async fn fetch_all(&self) -> Result<Vec<FirmwareRecord>, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT seq, sender, device_id, firmware_version, firmware_hash, timestamp
                 FROM firmware_records
                 ORDER BY seq ASC",
            )
            .map_err(read_error)?;

        let records = stmt
            .query_map([], |row| {
                Ok(FirmwareRecord {
                    seq: row.get::<_, i64>(0)? as u64,
                    sender: row.get(1)?,
                    device_id: row.get(2)?,
                    firmware_version: row.get(3)?,
                    firmware_hash: row.get(4)?,
                    timestamp: row.get::<_, i64>(5)? as u64,
                })
            })
            .map_err(read_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)?;

        Ok(records)
    }
}

fn open_error(err: rusqlite::Error) -> LedgerError {
    LedgerError::unavailable(format!("failed to open ledger database: {err}"))
}

fn read_error(err: rusqlite::Error) -> LedgerError {
    LedgerError::unavailable(format!("ledger read failed: {err}"))
}

/// Classifies a write failure: constraint violations (including the
/// append-only triggers) are refusals by the log itself; everything else is
/// infrastructure trouble.
fn write_error(err: rusqlite::Error) -> LedgerError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            LedgerError::rejected(err.to_string())
        },
        _ => LedgerError::unavailable(format!("ledger write failed: {err}")),
    }
}
