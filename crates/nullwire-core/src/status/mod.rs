//! Latest-known device status per owner identity.
//!
//! The store keeps exactly one [`DeviceStatusRecord`] per owner identity:
//! each `put` entirely replaces the previous record (no history), and a
//! `get_latest` for an identity that has never reported returns `None`
//! rather than an error. Absence is normal, not exceptional.
//!
//! Concurrency: writes for different identities are independent — neither
//! backend serializes unrelated identities behind one lock. A `get`
//! following a `put` by the same caller observes that `put`; writers racing
//! on the same identity leave one arbitrary-but-valid winner, ordered by
//! the store, not by caller-supplied timestamps.
//!
//! The read path is total with respect to stored data: rows written by
//! older or buggier writers are re-normalized leniently (see
//! [`telemetry`](crate::telemetry) for the ingest/read asymmetry), so a
//! malformed row degrades instead of failing the read.

mod memory;
mod sqlite;


use thiserror::Error;

pub use memory::MemoryStatusStore;
pub use sqlite::SqliteStatusStore;

use crate::telemetry::DeviceStatusRecord;

/// Errors that can occur on the status store write path.
///
/// Reads never fail on data shape; only genuine storage failures surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatusStoreError {
    /// The underlying storage could not complete the operation.
    #[error("status storage failed: {reason}")]
    Storage {
        /// Description of the underlying failure.
        reason: String,
    },
}

impl StatusStoreError {
    pub(crate) fn storage(reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            reason: reason.to_string(),
        }
    }
}

/// Persistence for the single latest status record per owner identity.
pub trait StatusStore: Send + Sync {
    /// Stores `record` as the latest status for its owner identity,
    /// overwriting any prior record. No history is retained.
    ///
    /// # Errors
    ///
    /// Returns [`StatusStoreError::Storage`] if the write cannot be
    /// persisted.
    fn put(&self, record: &DeviceStatusRecord) -> Result<(), StatusStoreError>;

    /// Returns the latest status record for `owner_identity`, or `None` if
    /// that identity has never reported.
    ///
    /// Malformed stored data never fails this call; it is re-normalized
    /// leniently into a well-formed record.
    ///
    /// # Errors
    ///
    /// Returns [`StatusStoreError::Storage`] only on storage I/O failure.
    fn get_latest(
        &self,
        owner_identity: &str,
    ) -> Result<Option<DeviceStatusRecord>, StatusStoreError>;
}
