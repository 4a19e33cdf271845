//! Firmware record types shared across the ledger and resolution layers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the append-only notarization log.
///
/// The serialized field names (`sender`, `device_id`, `firmware_version`,
/// `firmware_hash`, `timestamp`) are fixed by the ledger schema and must not
/// be renamed; existing deployments depend on them.
///
/// Records are immutable once appended. The `timestamp` is assigned by the
/// ledger at append time in UTC epoch seconds; it is monotonic non-decreasing
/// across appends but not unique, so consumers that need a total order must
/// fall back to `seq`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareRecord {
    /// Identity that submitted the record, assigned by the ledger.
    pub sender: String,

    /// Device or fleet-member identifier.
    pub device_id: String,

    /// Opaque version string. No ordering semantics beyond recency by
    /// timestamp.
    pub firmware_version: String,

    /// Opaque digest of the firmware image (e.g. hex-encoded content hash).
    pub firmware_hash: String,

    /// UTC epoch seconds, assigned by the ledger at append time.
    pub timestamp: u64,

    /// Append ordinal assigned by the ledger backend. Backend-local and not
    /// part of the wire shape; 0 for records deserialized from the wire.
    #[serde(skip)]
    pub seq: u64,
}

impl FirmwareRecord {
    /// Display-only ISO8601 rendering of the record timestamp.
    ///
    /// Never used in comparisons; resolution compares the integer
    /// `timestamp` directly.
    #[must_use]
    pub fn date(&self) -> String {
        epoch_to_iso8601(self.timestamp)
    }
}

/// Converts UTC epoch seconds to an ISO8601 string with millisecond
/// precision (`2024-01-01T00:00:00.000Z`).
///
/// Timestamps beyond chrono's representable range render as the epoch; the
/// ledger assigns timestamps from the system clock, so this is unreachable
/// in practice.
#[must_use]
pub fn epoch_to_iso8601(timestamp: u64) -> String {
    let ts = i64::try_from(timestamp).unwrap_or(0);
    DateTime::<Utc>::from_timestamp(ts, 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default())
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_field_names() {
        let record = FirmwareRecord {
            sender: "0xabc".to_string(),
            device_id: "dev-1".to_string(),
            firmware_version: "v1.0".to_string(),
            firmware_hash: "aaaa".to_string(),
            timestamp: 1_700_000_000,
            seq: 7,
        };

        let value = serde_json::to_value(&record).expect("failed to serialize record");
        let obj = value.as_object().expect("record must serialize to object");

        assert_eq!(obj.len(), 5, "seq must not leak into the wire shape");
        assert_eq!(obj["sender"], "0xabc");
        assert_eq!(obj["device_id"], "dev-1");
        assert_eq!(obj["firmware_version"], "v1.0");
        assert_eq!(obj["firmware_hash"], "aaaa");
        assert_eq!(obj["timestamp"], 1_700_000_000_u64);
    }

    #[test]
    fn test_date_rendering() {
        let record = FirmwareRecord {
            sender: "s".to_string(),
            device_id: "d".to_string(),
            firmware_version: "v".to_string(),
            firmware_hash: "h".to_string(),
            timestamp: 0,
            seq: 1,
        };
        assert_eq!(record.date(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_deserialized_record_has_zero_seq() {
        let record: FirmwareRecord = serde_json::from_str(
            r#"{"sender":"s","device_id":"d","firmware_version":"v","firmware_hash":"h","timestamp":5}"#,
        )
        .expect("failed to deserialize record");
        assert_eq!(record.seq, 0);
    }
}
