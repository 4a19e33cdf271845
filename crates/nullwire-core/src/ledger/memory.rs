//! In-process notarization log for tests and ephemeral runs.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use super::backend::{Ledger, LedgerError};
use crate::record::FirmwareRecord;

type Clock = dyn Fn() -> u64 + Send + Sync;

/// An in-memory append-only log.
///
/// Provides the same guarantees as the durable backend (ledger-assigned
/// sender/timestamp/seq, monotonic non-decreasing timestamps, append order
/// preserved) without touching disk. The clock is injectable so tests can
/// force timestamp collisions.
pub struct MemoryLedger {
    records: Mutex<Vec<FirmwareRecord>>,
    sender: String,
    clock: Arc<Clock>,
}

impl MemoryLedger {
    /// Creates an empty log using the system clock.
    #[must_use]
    pub fn new(sender: impl Into<String>) -> Self {
        Self::with_clock(sender, || {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        })
    }

    /// Creates an empty log with a caller-supplied clock.
    #[must_use]
    pub fn with_clock(
        sender: impl Into<String>,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            sender: sender.into(),
            clock: Arc::new(clock),
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn append(
        &self,
        device_id: &str,
        firmware_version: &str,
        firmware_hash: &str,
    ) -> Result<FirmwareRecord, LedgerError> {
        let mut records = self.records.lock().unwrap();

        // Timestamps never step backwards, even if the clock does.
        let last = records.last().map_or(0, |r| r.timestamp);
        let timestamp = (self.clock)().max(last);

        let record = FirmwareRecord {
            sender: self.sender.clone(),
            device_id: device_id.to_string(),
            firmware_version: firmware_version.to_string(),
            firmware_hash: firmware_hash.to_string(),
            timestamp,
            seq: records.len() as u64 + 1,
        };
        records.push(record.clone());

        Ok(record)
    }

    async fn fetch_all(&self) -> Result<Vec<FirmwareRecord>, LedgerError> {
        Ok(self.records.lock().unwrap().clone())
    }
}
