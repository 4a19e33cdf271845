//! Payload validation and canonicalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Partition index: root filesystem.
pub const PARTITION_ROOTFS: usize = 0;
/// Partition index: configuration slot.
pub const PARTITION_CONFIG: usize = 1;
/// Partition index: OTA slot A.
pub const PARTITION_OTA_A: usize = 2;
/// Partition index: OTA slot B.
pub const PARTITION_OTA_B: usize = 3;

/// Bad caller input, detected before any ledger or store access.
///
/// Always recoverable by the caller correcting the input. Shared by the
/// telemetry ingest path and the publish path
/// ([`validate_publish_fields`](crate::resolve::validate_publish_fields)).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required string field was missing, not a string, or empty after
    /// trimming.
    #[error("invalid or missing string field: {field}")]
    MissingField {
        /// Wire name of the offending field.
        field: &'static str,
    },

    /// A field that must be an array was something else.
    #[error("{field} must be an array")]
    NotAnArray {
        /// Wire name of the offending field.
        field: &'static str,
    },

    /// A partition health entry could not be coerced to 0 or 1.
    #[error("partition_health index {index} must be 0 or 1")]
    InvalidPartitionEntry {
        /// Index of the offending entry.
        index: usize,
    },
}

/// Canonical snapshot of one device's last-reported operational state.
///
/// Every string field is non-empty after trimming; `partition_health`
/// entries are exactly 0 or 1, indexed by the `PARTITION_*` convention.
/// `received_at` is assigned by the normalizer, never taken from caller
/// input, so status reports cannot be backdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusRecord {
    /// Device identifier as reported.
    pub device_id: String,

    /// Human-readable device name.
    pub device_name: String,

    /// Firmware version the device reports running.
    pub firmware_version: String,

    /// Manufacturer identifier.
    pub manufacturer_id: String,

    /// Wallet identifier associated with the device.
    pub wallet_id: String,

    /// Authenticated identity that owns/reported this device. Key of the
    /// status store.
    pub owner_identity: String,

    /// Device-reported current firmware hash, compared against the
    /// notarized hash during verification.
    pub hash: String,

    /// Free-text status.
    pub status_info: String,

    /// Binary health flag per tracked partition, in `PARTITION_*` index
    /// order.
    pub partition_health: Vec<u8>,

    /// Ingestion timestamp, assigned by the normalizer.
    pub received_at: DateTime<Utc>,
}

/// How strictly to treat partition entries that defy coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionMode {
    /// Fresh input: unparsable entries fail with a `ValidationError`
    /// identifying the index.
    Ingest,
    /// Already-stored data: unparsable entries degrade to 0 so reads stay
    /// total.
    Readback,
}

/// Validates and canonicalizes a raw device status payload.
///
/// Required string fields are looked up under the fleet's historical wire
/// names first (`firmware_ver`, `Manufaturer_id`, `WalletID`, `Hash`), with
/// snake_case equivalents accepted as aliases. Each must be a string that
/// is non-empty after trimming. `received_at` is always set to the
/// normalizer's current time; any caller-supplied value is ignored.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the offending wire field or
/// partition index.
pub fn normalize(owner_identity: &str, raw: &Value) -> Result<DeviceStatusRecord, ValidationError> {
    if owner_identity.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "owner_identity",
        });
    }

    let partition_health = coerce_partition_health(
        field(raw, &["partition_health", "partitionHealth"]),
        CoercionMode::Ingest,
    )?;

    Ok(DeviceStatusRecord {
        device_id: string_field(raw, "device_id", &["device_id", "deviceId"])?,
        device_name: string_field(raw, "device_name", &["device_name", "deviceName"])?,
        firmware_version: string_field(
            raw,
            "firmware_ver",
            &["firmware_ver", "firmware_version", "firmwareVersion"],
        )?,
        manufacturer_id: string_field(
            raw,
            "Manufaturer_id",
            &["Manufaturer_id", "manufacturer_id", "manufacturerId"],
        )?,
        wallet_id: string_field(raw, "WalletID", &["WalletID", "wallet_id", "walletId"])?,
        owner_identity: owner_identity.trim().to_string(),
        hash: string_field(raw, "Hash", &["Hash", "hash"])?,
        status_info: string_field(raw, "status_info", &["status_info", "statusInfo"])?,
        partition_health,
        received_at: Utc::now(),
    })
}

/// Coerces a raw partition-health value into binary flags.
///
/// Entry rules: exact 0 or 1 pass through; other numeric values (including
/// numeric strings and booleans) become 1 if strictly greater than zero,
/// else 0. Anything else fails in [`CoercionMode::Ingest`] and degrades to
/// 0 in [`CoercionMode::Readback`].
///
/// # Errors
///
/// In ingest mode, returns [`ValidationError::NotAnArray`] if the value is
/// missing or not an array, and [`ValidationError::InvalidPartitionEntry`]
/// for the first uncoercible entry. Readback mode never fails.
pub fn coerce_partition_health(
    value: Option<&Value>,
    mode: CoercionMode,
) -> Result<Vec<u8>, ValidationError> {
    let entries = match value.and_then(Value::as_array) {
        Some(entries) => entries,
        None if mode == CoercionMode::Readback => return Ok(Vec::new()),
        None => {
            return Err(ValidationError::NotAnArray {
                field: "partition_health",
            })
        },
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| coerce_entry(entry, index, mode))
        .collect()
}

fn coerce_entry(entry: &Value, index: usize, mode: CoercionMode) -> Result<u8, ValidationError> {
    match entry {
        Value::Number(n) => Ok(u8::from(n.as_f64().is_some_and(|v| v > 0.0))),
        Value::Bool(b) => Ok(u8::from(*b)),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) => Ok(u8::from(v > 0.0)),
            Err(_) if mode == CoercionMode::Readback => Ok(0),
            Err(_) => Err(ValidationError::InvalidPartitionEntry { index }),
        },
        _ if mode == CoercionMode::Readback => Ok(0),
        _ => Err(ValidationError::InvalidPartitionEntry { index }),
    }
}

/// Looks up the first present key among `keys`.
fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| raw.get(key))
}

/// Required string field: present under one of `keys`, a string, non-empty
/// after trimming. `wire_name` is the fleet's primary name for the field,
/// used in error messages.
fn string_field(
    raw: &Value,
    wire_name: &'static str,
    keys: &[&str],
) -> Result<String, ValidationError> {
    match field(raw, keys) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ValidationError::MissingField { field: wire_name }),
    }
}
