//! nullwire-core - Firmware Integrity Notarization Core
//!
//! This library provides the domain logic for anchoring firmware release
//! hashes to an append-only, tamper-evident log and for verifying that a
//! device's reported firmware hash matches the most recently notarized one.
//!
//! # Modules
//!
//! - [`ledger`]: The append-only notarization log capability and its
//!   backends (`SQLite` with WAL mode, in-memory)
//! - [`resolve`]: Latest-record resolution and hash verification over the
//!   full record history of a device
//! - [`telemetry`]: Strict normalization of raw device status payloads into
//!   canonical records
//! - [`status`]: Latest-known device status per owner identity
//! - [`config`]: TOML configuration parsing with fail-closed validation
//!
//! The external ledger network is modeled as a capability
//! ([`ledger::Ledger`]) rather than a concrete binding: any total-ordered,
//! multi-writer append log satisfies the contract. Consensus, block
//! production, and transaction finality belong to whatever backs that
//! capability, not to this crate.

pub mod config;
pub mod ledger;
pub mod record;
pub mod resolve;
pub mod status;
pub mod telemetry;

pub use config::{ConfigError, NotaryConfig};
pub use ledger::{Ledger, LedgerError, MemoryLedger, SqliteLedger};
pub use record::FirmwareRecord;
pub use resolve::{
    resolve_latest, validate_publish_fields, verify, ResolvedFirmware, VerificationReason,
    VerificationResult,
};
pub use status::{MemoryStatusStore, SqliteStatusStore, StatusStore, StatusStoreError};
pub use telemetry::{DeviceStatusRecord, ValidationError};
