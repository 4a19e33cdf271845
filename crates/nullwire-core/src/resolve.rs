//! Latest-record resolution and hash verification.
//!
//! Given the full (or device-filtered) history of ledger records, this
//! module computes the single authoritative "current" firmware record for a
//! device and answers verification queries against it. All functions are
//! pure; the caller supplies the records (normally from
//! [`Ledger::fetch_all`](crate::ledger::Ledger::fetch_all), which returns
//! them in log append order).
//!
//! # Tie-break policy
//!
//! Ledger timestamps are non-decreasing but not unique: two publishes can
//! land in the same second. Sorting by timestamp alone would degrade to an
//! unspecified order on ties, so resolution breaks ties by log append order
//! (the later-appended record wins). With backend-assigned `seq` ordinals
//! this holds even for shuffled input; for wire-deserialized records
//! (`seq == 0`) the later slice position wins, which matches append order
//! for slices taken from `fetch_all`.

use serde::Serialize;

use crate::record::FirmwareRecord;
use crate::telemetry::ValidationError;

/// Why a verification query got the answer it did.
///
/// `NoHistory` and `HashMismatch` imply different remediation (publish a
/// first record vs. investigate the device), so they are never conflated
/// into the bare boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    /// The candidate hash matches the resolved latest record.
    Match,
    /// A latest record exists but its hash differs from the candidate.
    HashMismatch,
    /// The ledger holds no records for this device.
    NoHistory,
}

/// The resolved latest record's display fields, copied for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFirmware {
    /// Version string of the latest notarized record.
    pub latest_firmware_version: String,
    /// Hash of the latest notarized record.
    pub latest_firmware_hash: String,
    /// Ledger timestamp of the latest record, UTC epoch seconds.
    pub timestamp: u64,
    /// Display-only ISO8601 rendering of `timestamp`.
    pub date: String,
}

/// Result of a verification query. Computed per query, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// Whether the candidate hash matches the resolved latest hash.
    pub verified: bool,

    /// Distinguishes "no firmware history" from "hash mismatch".
    pub reason: VerificationReason,

    /// Fields of the resolved latest record; `None` only for `NoHistory`.
    /// Flattened on the wire, so `NoHistory` results simply omit them.
    #[serde(flatten)]
    pub latest: Option<ResolvedFirmware>,
}

/// Resolves the authoritative current firmware record for a device.
///
/// Filters `records` by exact string equality on `device_id` and picks the
/// record with the maximum timestamp, breaking timestamp ties by log append
/// order (see the module docs). Returns `None` if the device has no
/// history.
#[must_use]
pub fn resolve_latest<'a>(
    device_id: &str,
    records: &'a [FirmwareRecord],
) -> Option<&'a FirmwareRecord> {
    let mut latest: Option<&FirmwareRecord> = None;

    for record in records.iter().filter(|r| r.device_id == device_id) {
        let newer = match latest {
            None => true,
            Some(current) => {
                (record.timestamp, record.seq) >= (current.timestamp, current.seq)
            },
        };
        if newer {
            latest = Some(record);
        }
    }

    latest
}

/// Answers whether `candidate_hash` matches the latest notarized hash for
/// `device_id`.
///
/// Hash comparison is exact string equality; the hash format is expected
/// canonical already, so no case or whitespace normalization is applied.
#[must_use]
pub fn verify(
    device_id: &str,
    candidate_hash: &str,
    records: &[FirmwareRecord],
) -> VerificationResult {
    let Some(latest) = resolve_latest(device_id, records) else {
        return VerificationResult {
            verified: false,
            reason: VerificationReason::NoHistory,
            latest: None,
        };
    };

    let verified = latest.firmware_hash == candidate_hash;
    VerificationResult {
        verified,
        reason: if verified {
            VerificationReason::Match
        } else {
            VerificationReason::HashMismatch
        },
        latest: Some(ResolvedFirmware {
            latest_firmware_version: latest.firmware_version.clone(),
            latest_firmware_hash: latest.firmware_hash.clone(),
            timestamp: latest.timestamp,
            date: latest.date(),
        }),
    }
}

/// Publish-side validation: all three fields must be non-empty after
/// trimming. Runs before any ledger access, so a validation failure never
/// touches the log.
///
/// # Errors
///
/// Returns [`ValidationError::MissingField`] naming the first empty field.
pub fn validate_publish_fields(
    device_id: &str,
    firmware_version: &str,
    firmware_hash: &str,
) -> Result<(), ValidationError> {
    for (field, value) in [
        ("device_id", device_id),
        ("firmware_version", firmware_version),
        ("firmware_hash", firmware_hash),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField { field });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn record(device_id: &str, version: &str, hash: &str, timestamp: u64, seq: u64) -> FirmwareRecord {
        FirmwareRecord {
            sender: "0xpublisher".to_string(),
            device_id: device_id.to_string(),
            firmware_version: version.to_string(),
            firmware_hash: hash.to_string(),
            timestamp,
            seq,
        }
    }

    #[test]
    fn test_resolve_empty_history() {
        assert!(resolve_latest("dev-1", &[]).is_none());
    }

    #[test]
    fn test_resolve_ignores_other_devices() {
        let records = vec![record("dev-2", "v9", "zzzz", 500, 1)];
        assert!(resolve_latest("dev-1", &records).is_none());
    }

    #[test]
    fn test_resolve_picks_max_timestamp() {
        let records = vec![
            record("dev-1", "v1.0", "aaaa", 100, 1),
            record("dev-1", "v1.2", "cccc", 300, 2),
            record("dev-1", "v1.1", "bbbb", 200, 3),
        ];

        let latest = resolve_latest("dev-1", &records).expect("expected a record");
        assert_eq!(latest.firmware_version, "v1.2");
    }

    #[test]
    fn test_resolve_tie_breaks_by_append_order() {
        // Two publishes in the same second: the later-appended wins.
        let records = vec![
            record("dev-1", "v1.0", "aaaa", 100, 1),
            record("dev-1", "v1.1", "bbbb", 100, 2),
        ];

        let latest = resolve_latest("dev-1", &records).expect("expected a record");
        assert_eq!(latest.firmware_version, "v1.1");
    }

    #[test]
    fn test_resolve_tie_break_holds_for_shuffled_input() {
        let records = vec![
            record("dev-1", "v1.1", "bbbb", 100, 2),
            record("dev-1", "v1.0", "aaaa", 100, 1),
        ];

        let latest = resolve_latest("dev-1", &records).expect("expected a record");
        assert_eq!(latest.firmware_version, "v1.1");
    }

    #[test]
    fn test_resolve_exact_device_id_match() {
        let records = vec![record("dev-10", "v1.0", "aaaa", 100, 1)];
        assert!(resolve_latest("dev-1", &records).is_none());
    }

    #[test]
    fn test_verify_no_history_reason() {
        let result = verify("dev-1", "aaaa", &[]);
        assert!(!result.verified);
        assert_eq!(result.reason, VerificationReason::NoHistory);
        assert!(result.latest.is_none());
    }

    #[test]
    fn test_verify_match_and_mismatch() {
        let records = vec![
            record("dev-1", "v1.0", "aaaa", 100, 1),
            record("dev-1", "v1.1", "bbbb", 200, 2),
        ];

        let matched = verify("dev-1", "bbbb", &records);
        assert!(matched.verified);
        assert_eq!(matched.reason, VerificationReason::Match);
        let latest = matched.latest.expect("expected latest fields");
        assert_eq!(latest.latest_firmware_version, "v1.1");
        assert_eq!(latest.latest_firmware_hash, "bbbb");
        assert_eq!(latest.timestamp, 200);

        let mismatched = verify("dev-1", "aaaa", &records);
        assert!(!mismatched.verified);
        assert_eq!(mismatched.reason, VerificationReason::HashMismatch);
        assert!(mismatched.latest.is_some());
    }

    #[test]
    fn test_verify_exact_hash_comparison() {
        // No case or whitespace normalization.
        let records = vec![record("dev-1", "v1.0", "AAAA", 100, 1)];
        assert!(!verify("dev-1", "aaaa", &records).verified);
        assert!(!verify("dev-1", " AAAA", &records).verified);
        assert!(verify("dev-1", "AAAA", &records).verified);
    }

    #[test]
    fn test_validate_publish_fields() {
        assert!(validate_publish_fields("dev-1", "v1.0", "aaaa").is_ok());

        assert_eq!(
            validate_publish_fields("", "v1.0", "aaaa"),
            Err(ValidationError::MissingField { field: "device_id" })
        );
        assert_eq!(
            validate_publish_fields("dev-1", "   ", "aaaa"),
            Err(ValidationError::MissingField {
                field: "firmware_version"
            })
        );
        assert_eq!(
            validate_publish_fields("dev-1", "v1.0", ""),
            Err(ValidationError::MissingField {
                field: "firmware_hash"
            })
        );
    }

    proptest! {
        /// The resolved record always carries the maximum timestamp among
        /// the device's records, regardless of input order.
        #[test]
        fn prop_resolved_has_max_timestamp(timestamps in proptest::collection::vec(0_u64..1000, 1..20)) {
            let records: Vec<FirmwareRecord> = timestamps
                .iter()
                .enumerate()
                .map(|(i, &ts)| record("dev-1", &format!("v{i}"), &format!("h{i}"), ts, i as u64 + 1))
                .collect();

            let latest = resolve_latest("dev-1", &records).expect("non-empty history");
            let max_ts = timestamps.iter().copied().max().expect("non-empty input");
            prop_assert_eq!(latest.timestamp, max_ts);

            // Among max-timestamp records, the highest seq wins.
            let max_seq = records
                .iter()
                .filter(|r| r.timestamp == max_ts)
                .map(|r| r.seq)
                .max()
                .expect("at least one record at max timestamp");
            prop_assert_eq!(latest.seq, max_seq);
        }
    }
}
