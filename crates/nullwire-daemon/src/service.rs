//! The notarization service composition root.
//!
//! One logical operation per inbound call; operations are independent and
//! may run concurrently across callers. The only shared in-process mutable
//! state is the status store's per-identity map, which the store itself
//! keeps atomic per identity. Ledger calls suspend on I/O with no implicit
//! timeout; callers bound them with their own deadline (the HTTP binding
//! uses [`tokio::time::timeout`]) and observe [`ServiceError::Cancelled`]
//! on expiry. Appends are atomic per record on the backend, so a cancelled
//! publish leaves no partial write behind.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use nullwire_core::ledger::{Ledger, LedgerError};
use nullwire_core::record::FirmwareRecord;
use nullwire_core::resolve::{self, VerificationResult};
use nullwire_core::status::{StatusStore, StatusStoreError};
use nullwire_core::telemetry::{self, DeviceStatusRecord, ValidationError};

/// Failures surfaced by service operations, each with a distinguishable
/// kind so callers can pick the right remediation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// Bad caller input; never reached the ledger or store.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The ledger reported a failure (unavailable or rejected).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The status store write path failed.
    #[error(transparent)]
    Status(#[from] StatusStoreError),

    /// The caller's deadline expired while an operation was suspended on
    /// ledger I/O. No partial ledger write exists.
    #[error("operation cancelled by caller deadline")]
    Cancelled,
}

/// Publish/fetch/verify over the ledger plus status ingest/query, composed
/// behind one handle.
pub struct NotaryService {
    ledger: Arc<dyn Ledger>,
    status: Arc<dyn StatusStore>,
}

impl NotaryService {
    /// Creates a service over the given ledger and status store.
    pub fn new(ledger: Arc<dyn Ledger>, status: Arc<dyn StatusStore>) -> Self {
        Self { ledger, status }
    }

    /// Notarizes a firmware release: validates the three fields, then
    /// appends one record to the ledger.
    ///
    /// # Errors
    ///
    /// Returns `Validation` before touching the ledger if any field is
    /// empty after trimming, or a `Ledger` failure from the append.
    pub async fn publish_firmware(
        &self,
        device_id: &str,
        firmware_version: &str,
        firmware_hash: &str,
    ) -> Result<FirmwareRecord, ServiceError> {
        resolve::validate_publish_fields(device_id, firmware_version, firmware_hash)?;

        let record = self
            .ledger
            .append(device_id, firmware_version, firmware_hash)
            .await?;
        info!(
            device_id,
            firmware_version,
            seq = record.seq,
            timestamp = record.timestamp,
            "firmware record notarized"
        );
        Ok(record)
    }

    /// Returns every ledger record in the log's native append order.
    ///
    /// Newest-first is NOT guaranteed; callers that need the latest record
    /// per device must go through [`Self::verify_firmware`] rather than
    /// assume an ordering.
    ///
    /// # Errors
    ///
    /// Returns a `Ledger` failure if the log cannot be read.
    pub async fn list_firmware_records(&self) -> Result<Vec<FirmwareRecord>, ServiceError> {
        Ok(self.ledger.fetch_all().await?)
    }

    /// Verifies a candidate hash against the latest notarized record for a
    /// device.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if either input is empty, or a `Ledger` failure
    /// if the log cannot be read. An empty history is not an error; it
    /// yields a no-history verification result.
    pub async fn verify_firmware(
        &self,
        device_id: &str,
        candidate_hash: &str,
    ) -> Result<VerificationResult, ServiceError> {
        for (field, value) in [("device_id", device_id), ("firmware_hash", candidate_hash)] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field }.into());
            }
        }

        let records = self.ledger.fetch_all().await?;
        Ok(resolve::verify(device_id, candidate_hash, &records))
    }

    /// Normalizes a raw device status payload and stores it as the latest
    /// status for `owner_identity`, replacing any prior record.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the offending field if the payload fails
    /// strict normalization, or `Status` if the write cannot be persisted.
    pub fn ingest_device_status(
        &self,
        owner_identity: &str,
        raw: &Value,
    ) -> Result<DeviceStatusRecord, ServiceError> {
        let record = telemetry::normalize(owner_identity, raw)?;
        self.status.put(&record)?;
        info!(
            owner_identity,
            device_id = %record.device_id,
            "device status recorded"
        );
        Ok(record)
    }

    /// Returns the latest stored status for `owner_identity`, or `None` if
    /// that identity has never reported.
    ///
    /// # Errors
    ///
    /// Returns `Status` only on storage I/O failure; absence and malformed
    /// historical data never fail this call.
    pub fn get_device_status(
        &self,
        owner_identity: &str,
    ) -> Result<Option<DeviceStatusRecord>, ServiceError> {
        Ok(self.status.get_latest(owner_identity)?)
    }
}
