//! Append-only notarization log for firmware records.
//!
//! This module models the ledger as a capability: [`Ledger`] exposes exactly
//! the two operations the notarization core needs (`append`, `fetch_all`)
//! and hides whatever concretely backs the log. Any total-ordered,
//! multi-writer, tamper-evident append log satisfies the contract.
//!
//! # Guarantees
//!
//! - **Append-only semantics**: Records can only be added, never modified or
//!   deleted. The `SQLite` backend enforces this with schema triggers.
//! - **Ledger-assigned fields**: `sender`, `timestamp`, and `seq` are
//!   assigned by the backend at append time, never by the caller.
//! - **Monotonic timestamps**: Non-decreasing in append order, but not
//!   unique; two records may share a timestamp.
//! - **No caching**: Every `fetch_all` re-reads the log, so appends from
//!   concurrent writers are always visible.
//!
//! # Example
//!
//! ```rust,no_run
//! use nullwire_core::ledger::{Ledger, SqliteLedger};
//!
//! # async fn example() -> Result<(), nullwire_core::ledger::LedgerError> {
//! let ledger = SqliteLedger::open("/path/to/ledger.db", "0xpublisher")?;
//!
//! let record = ledger.append("dev-1", "v1.0", "aaaa").await?;
//! let all = ledger.fetch_all().await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

pub use backend::{Ledger, LedgerError};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
