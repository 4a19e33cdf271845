//! The ledger capability trait and its error taxonomy.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::FirmwareRecord;

/// Errors that can occur during ledger operations.
///
/// The two variants carry the retry semantics callers need: `Unavailable`
/// is transient and safe to retry with backoff; `Rejected` means the log
/// itself refused the write and retrying without changing input will fail
/// again.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// The ledger could not be reached or the read/write infrastructure
    /// failed. No data was corrupted; safe to retry.
    #[error("ledger unavailable: {reason}")]
    Unavailable {
        /// Description of the underlying failure.
        reason: String,
    },

    /// The log refused the write (e.g. malformed input per the log's own
    /// validation, or an attempt to violate append-only semantics).
    #[error("ledger rejected the write: {reason}")]
    Rejected {
        /// Description of the refusal.
        reason: String,
    },
}

impl LedgerError {
    /// Shorthand for an `Unavailable` error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `Rejected` error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Read/append access to the append-only notarization log.
///
/// Implementations must provide atomicity per record: an `append` either
/// fully succeeds on the log or fully fails, with no partial-write state
/// for callers to clean up. Both methods suspend on I/O; callers that need
/// a bound on the suspension wrap the call in their own deadline.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Appends one firmware record to the shared log.
    ///
    /// The backend assigns `sender`, `timestamp`, and `seq`; callers supply
    /// only the device identity, version, and hash. The append is permanent.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the log cannot be reached and
    /// [`LedgerError::Rejected`] if the log refuses the write.
    async fn append(
        &self,
        device_id: &str,
        firmware_version: &str,
        firmware_hash: &str,
    ) -> Result<FirmwareRecord, LedgerError>;

    /// Returns every record in the log, in the log's native append order.
    ///
    /// There is no stable maximum size; callers must handle large result
    /// sets. Every call re-reads the log, so appends from other writers are
    /// visible on the next fetch.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] on read failure.
    async fn fetch_all(&self) -> Result<Vec<FirmwareRecord>, LedgerError>;
}
