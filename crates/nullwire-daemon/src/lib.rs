//! nullwire-daemon - Firmware Notarization Daemon Library
//!
//! Composition root for the notarization core: [`service::NotaryService`]
//! wires the ledger capability, resolution engine, telemetry normalizer,
//! and status store together, and [`http`] exposes the service over a JSON
//! HTTP binding.

pub mod http;
pub mod service;

pub use service::{NotaryService, ServiceError};
