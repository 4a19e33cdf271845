//! Device telemetry normalization.
//!
//! Devices report status as loosely-typed JSON with inconsistent field
//! casing (the fleet's historical wire schema includes `Manufaturer_id`,
//! `WalletID`, and friends) and partition-health flags that arrive as
//! numbers, numeric strings, or booleans. This module is the strict
//! parse-and-validate boundary that turns such a payload into one canonical
//! [`DeviceStatusRecord`]; no partial or speculative typing survives past
//! ingestion.
//!
//! # Ingest/read asymmetry
//!
//! Normalizing fresh input is strict: a partition entry that cannot be
//! coerced fails with a [`ValidationError`] naming its index. Re-normalizing
//! already-stored data is lenient: unparsable entries degrade to `0` so the
//! read path stays total. Ingestion must reject garbage, but serving
//! previously accepted data must never fail.

mod normalize;


pub use normalize::{
    coerce_partition_health, normalize, CoercionMode, DeviceStatusRecord, ValidationError,
    PARTITION_CONFIG, PARTITION_OTA_A, PARTITION_OTA_B, PARTITION_ROOTFS,
};
