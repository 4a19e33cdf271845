//! JSON/HTTP binding for the notarization service.
//!
//! One valid realization of the transport-agnostic service operations:
//!
//! - `POST /publish` — notarize a firmware release
//! - `POST /verify` — check a candidate hash against the latest record
//! - `GET /fetch` — all ledger records, append order
//! - `POST /device-status` — ingest a raw device status payload
//! - `GET /device-status?owner=` — latest status for an owner identity
//!
//! Ledger-touching handlers bound the suspension point with a deadline;
//! expiry maps to 504 with no partial ledger write left behind.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use nullwire_core::ledger::LedgerError;
use nullwire_core::record::FirmwareRecord;
use nullwire_core::resolve::VerificationReason;
use nullwire_core::telemetry::ValidationError;

use crate::service::{NotaryService, ServiceError};

/// Deadline for operations that suspend on ledger I/O.
const LEDGER_DEADLINE: Duration = Duration::from_secs(30);

/// Builds the HTTP router over a shared service handle.
pub fn router(service: Arc<NotaryService>) -> Router {
    Router::new()
        .route("/publish", post(publish))
        .route("/verify", post(verify))
        .route("/fetch", get(fetch))
        .route("/device-status", post(ingest_status).get(get_status))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    // Empty defaults let validation name the missing field instead of
    // surfacing a serde error.
    #[serde(default, alias = "deviceId")]
    device_id: String,
    #[serde(default, alias = "firmwareVersion")]
    firmware_version: String,
    #[serde(default, alias = "firmwareHash")]
    firmware_hash: String,
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default, alias = "deviceId")]
    device_id: String,
    #[serde(default, alias = "firmwareHash")]
    firmware_hash: String,
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    owner: String,
}

async fn publish(
    State(service): State<Arc<NotaryService>>,
    Json(req): Json<PublishRequest>,
) -> Response {
    let result = bound(service.publish_firmware(
        &req.device_id,
        &req.firmware_version,
        &req.firmware_hash,
    ))
    .await;

    match result {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Firmware hash published successfully",
                "record": record_view(&record),
            })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn verify(
    State(service): State<Arc<NotaryService>>,
    Json(req): Json<VerifyRequest>,
) -> Response {
    match bound(service.verify_firmware(&req.device_id, &req.firmware_hash)).await {
        Ok(result) => {
            let mut body = serde_json::to_value(&result)
                .unwrap_or_else(|_| json!({ "verified": result.verified }));
            if result.reason == VerificationReason::NoHistory {
                body["message"] = json!("No firmware found for this device_id");
            }
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(err) => error_response(&err),
    }
}

async fn fetch(State(service): State<Arc<NotaryService>>) -> Response {
    match bound(service.list_firmware_records()).await {
        Ok(records) => {
            let messages: Vec<Value> = records.iter().map(record_view).collect();
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "count": messages.len(),
                    "messages": messages,
                })),
            )
                .into_response()
        },
        Err(err) => error_response(&err),
    }
}

async fn ingest_status(
    State(service): State<Arc<NotaryService>>,
    Json(raw): Json<Value>,
) -> Response {
    let Some(owner) = owner_identity(&raw) else {
        return error_response(&ServiceError::Validation(ValidationError::MissingField {
            field: "owner_id",
        }));
    };

    match service.ingest_device_status(owner, &raw) {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Device status recorded",
                "data": record,
            })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn get_status(
    State(service): State<Arc<NotaryService>>,
    Query(query): Query<StatusQuery>,
) -> Response {
    match service.get_device_status(&query.owner) {
        Ok(record) => (StatusCode::OK, Json(json!({ "data": record }))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// Bounds a ledger-touching operation with the handler deadline.
async fn bound<T>(
    operation: impl std::future::Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    match tokio::time::timeout(LEDGER_DEADLINE, operation).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Cancelled),
    }
}

/// Owner identity as carried in the status payload. `Apprwrite_id` is the
/// fleet's historical wire name for it.
fn owner_identity(raw: &Value) -> Option<&str> {
    ["owner_id", "owner_identity", "Apprwrite_id", "appwrite_id"]
        .iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
}

/// Wire view of a ledger record: the fixed five fields plus the derived
/// display date.
fn record_view(record: &FirmwareRecord) -> Value {
    json!({
        "sender": record.sender,
        "device_id": record.device_id,
        "firmware_version": record.firmware_version,
        "firmware_hash": record.firmware_hash,
        "timestamp": record.timestamp,
        "date": record.date(),
    })
}

fn error_response(err: &ServiceError) -> Response {
    let status = match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Ledger(LedgerError::Rejected { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Ledger(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Status(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
    };

    if status.is_server_error() {
        warn!(%err, "request failed");
    }

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
