//! Operator API under `/admin`.
//!
//! Every response is JSON with a `success` flag. Device-scoped routes
//! answer 404 for serials the server has never seen.

use adms_core::Command;
use adms_core::command::{DeleteUser, EnrollFingerprint, PasswordUpdate, SetUser};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::error::AdminError;
use crate::state::AppState;
use crate::storage::Device;

type AdminResult = Result<Json<Value>, AdminError>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(list_devices))
        .route("/devices/{sn}/subjects", get(device_subjects))
        .route("/attendance/{sn}", get(device_attendance))
        .route("/verify/{sn}", post(verify_device).delete(unverify_device))
        .route("/reupload/queue", get(reupload_queue))
        .route("/reupload/{sn}", post(request_reupload))
        .route("/clearlog/{sn}", post(clear_log))
        .route("/info/{sn}", post(request_info))
        .route("/reboot/{sn}", post(reboot))
        .route("/user/{sn}", post(set_user))
        .route("/user/{sn}/{pin}", delete(delete_user))
        .route("/enrollfp/{sn}", post(enroll_fingerprint))
        .route("/transferfp/{sn}", post(transfer_fingerprints))
        .route("/commands/queue", get(command_queue))
        .route("/subjects/{pin}", get(subject_profile))
        .route("/fingerprints", get(fingerprints))
}

// =========================================================================
// Helpers
// =========================================================================

async fn require_device(state: &AppState, sn: &str) -> Result<Device, AdminError> {
    state
        .registry
        .get(sn)
        .await?
        .ok_or_else(|| AdminError::device_not_found(sn))
}

fn device_brief(device: &Device) -> Value {
    json!({ "sn": device.sn, "name": device.name })
}

/// A scalar that operators send as a JSON string, number or boolean.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    /// Integral numbers and non-empty trimmed strings.
    fn text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Self::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }

    fn int(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Flag(_) => None,
        }
    }

    fn flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            other => other.int().map(|n| n != 0),
        }
    }
}

fn required_pin(pin: Option<&Scalar>) -> Result<String, AdminError> {
    pin.ok_or_else(|| AdminError::missing("pin"))?
        .text()
        .ok_or_else(|| AdminError::BadRequest("Invalid parameter: pin".into()))
}

fn required_int(value: Option<&Scalar>, key: &str) -> Result<i64, AdminError> {
    value
        .ok_or_else(|| AdminError::missing(key))?
        .int()
        .ok_or_else(|| AdminError::BadRequest(format!("Invalid parameter: {key}")))
}

/// `passwd` absent or empty leaves the password alone; zero clears it.
fn password_update(value: Option<&Scalar>) -> Result<Option<PasswordUpdate>, AdminError> {
    let text = match value {
        None => return Ok(None),
        Some(Scalar::Text(s)) => s.trim().to_string(),
        Some(Scalar::Number(n)) => n.to_string(),
        Some(Scalar::Flag(_)) => {
            return Err(AdminError::BadRequest("Invalid parameter: passwd".into()));
        }
    };
    if text.is_empty() {
        return Ok(None);
    }
    if text.parse::<i64>() == Ok(0) {
        return Ok(Some(PasswordUpdate::Clear));
    }
    Ok(Some(PasswordUpdate::Set(text)))
}

#[derive(Debug, Deserialize)]
struct SetUserBody {
    pin: Option<Scalar>,
    privilege: Option<Scalar>,
    passwd: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct EnrollBody {
    pin: Option<Scalar>,
    fid: Option<Scalar>,
    retry: Option<Scalar>,
    overwrite: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct TransferBody {
    pin: Option<Scalar>,
    source_sn: Option<String>,
}

async fn queue_for_device(state: &AppState, sn: &str, command: Command) -> AdminResult {
    let device = require_device(state, sn).await?;
    let id = state.queue.enqueue(sn, &command).await?;
    let params = serde_json::from_str::<Value>(&command.params_json().unwrap_or_default())
        .unwrap_or_else(|_| json!({}));

    Ok(Json(json!({
        "success": true,
        "message": format!("Command queued: {}", command.label()),
        "command_id": id,
        "device": device_brief(&device),
        "params": params,
    })))
}

// =========================================================================
// Devices and trust
// =========================================================================

async fn list_devices(State(state): State<AppState>) -> AdminResult {
    let devices = state.registry.list().await?;
    Ok(Json(json!({ "success": true, "devices": devices })))
}

const ATTENDANCE_PAGE_DEFAULT: u32 = 100;
const ATTENDANCE_PAGE_MAX: u32 = 1000;

#[derive(Debug, Deserialize)]
struct AttendanceQuery {
    limit: Option<u32>,
}

async fn device_attendance(
    State(state): State<AppState>,
    Path(sn): Path<String>,
    Query(query): Query<AttendanceQuery>,
) -> AdminResult {
    let device = require_device(&state, &sn).await?;
    let limit = query
        .limit
        .unwrap_or(ATTENDANCE_PAGE_DEFAULT)
        .clamp(1, ATTENDANCE_PAGE_MAX);
    let records = state.ingest.recent(&sn, limit).await?;
    let total = state.ingest.total(&sn).await?;

    Ok(Json(json!({
        "success": true,
        "device": device_brief(&device),
        "total": total,
        "count": records.len(),
        "records": records,
    })))
}

async fn verify_device(State(state): State<AppState>, Path(sn): Path<String>) -> AdminResult {
    let device = require_device(&state, &sn).await?;
    state.registry.set_verified(&sn, true).await?;
    info!(device_sn = %sn, "Terminal verified by operator");

    Ok(Json(json!({
        "success": true,
        "message": format!("Device {sn} has been verified"),
        "device": { "sn": device.sn, "name": device.name, "verified": true },
    })))
}

async fn unverify_device(State(state): State<AppState>, Path(sn): Path<String>) -> AdminResult {
    let device = require_device(&state, &sn).await?;
    state.registry.set_verified(&sn, false).await?;
    info!(device_sn = %sn, "Terminal unverified by operator");

    Ok(Json(json!({
        "success": true,
        "message": format!("Device {sn} has been unverified"),
        "device": { "sn": device.sn, "name": device.name, "verified": false },
    })))
}

// =========================================================================
// Reupload
// =========================================================================

async fn request_reupload(State(state): State<AppState>, Path(sn): Path<String>) -> AdminResult {
    let device = require_device(&state, &sn).await?;
    state.reupload.request(&sn).await;
    state.registry.reset_initial_sync(&sn).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Device queued for reupload: {sn}"),
        "device": {
            "sn": device.sn,
            "name": device.name,
            "lastActivity": device.last_activity,
            "status": device.status,
        },
    })))
}

async fn reupload_queue(State(state): State<AppState>) -> AdminResult {
    let queue: Vec<Value> = state
        .reupload
        .snapshot()
        .await
        .into_iter()
        .map(|(sn, requested_at)| json!({ "sn": sn, "requested_at": requested_at }))
        .collect();
    Ok(Json(json!({ "success": true, "queue": queue })))
}

// =========================================================================
// Commands
// =========================================================================

async fn clear_log(State(state): State<AppState>, Path(sn): Path<String>) -> AdminResult {
    queue_for_device(&state, &sn, Command::ClearLog).await
}

async fn request_info(State(state): State<AppState>, Path(sn): Path<String>) -> AdminResult {
    queue_for_device(&state, &sn, Command::Info).await
}

async fn reboot(State(state): State<AppState>, Path(sn): Path<String>) -> AdminResult {
    queue_for_device(&state, &sn, Command::Reboot).await
}

async fn set_user(
    State(state): State<AppState>,
    Path(sn): Path<String>,
    body: Result<Json<SetUserBody>, JsonRejection>,
) -> AdminResult {
    let Json(body) = body?;
    let pin = required_pin(body.pin.as_ref())?;
    let privilege = required_int(body.privilege.as_ref(), "privilege")?;
    let password = password_update(body.passwd.as_ref())?;

    queue_for_device(
        &state,
        &sn,
        Command::SetUser(SetUser {
            pin,
            privilege,
            password,
        }),
    )
    .await
}

async fn delete_user(
    State(state): State<AppState>,
    Path((sn, pin)): Path<(String, String)>,
) -> AdminResult {
    let pin = pin.trim().to_string();
    if pin.is_empty() {
        return Err(AdminError::missing("pin"));
    }
    queue_for_device(&state, &sn, Command::DeleteUser(DeleteUser { pin })).await
}

async fn enroll_fingerprint(
    State(state): State<AppState>,
    Path(sn): Path<String>,
    body: Result<Json<EnrollBody>, JsonRejection>,
) -> AdminResult {
    let Json(body) = body?;
    let pin = required_pin(body.pin.as_ref())?;
    let fid = required_int(body.fid.as_ref(), "fid")?;
    let retry = match body.retry.as_ref().and_then(Scalar::int) {
        Some(n) => u32::try_from(n)
            .map_err(|_| AdminError::BadRequest("Invalid parameter: retry".into()))?,
        None => state.registry.config().enroll_retry,
    };
    let overwrite = body
        .overwrite
        .as_ref()
        .and_then(Scalar::flag)
        .unwrap_or(false);

    queue_for_device(
        &state,
        &sn,
        Command::EnrollFingerprint(EnrollFingerprint {
            pin,
            fid,
            retry,
            overwrite,
        }),
    )
    .await
}

async fn transfer_fingerprints(
    State(state): State<AppState>,
    Path(sn): Path<String>,
    body: Result<Json<TransferBody>, JsonRejection>,
) -> AdminResult {
    let Json(body) = body?;
    let pin = required_pin(body.pin.as_ref())?;
    let source_sn = body
        .source_sn
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdminError::missing("source_sn"))?
        .to_string();

    let target = require_device(&state, &sn).await?;
    let commands = state
        .directory
        .plan_fingerprint_transfer(&pin, &source_sn)
        .await?;

    let mut finger_ids = Vec::with_capacity(commands.len());
    for command in &commands {
        state.queue.enqueue(&sn, command).await?;
        if let Command::PushFingerprint(p) = command {
            finger_ids.push(p.finger_id);
        }
    }

    info!(
        target_sn = %sn,
        source_sn = %source_sn,
        pin = %pin,
        count = finger_ids.len(),
        "Fingerprint transfer queued"
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("Command queued: DATA_FP ({} fingerprints)", finger_ids.len()),
        "target_device": device_brief(&target),
        "source_device": source_sn,
        "pin": pin,
        "fingerprints_queued": finger_ids.len(),
        "finger_ids": finger_ids,
    })))
}

async fn command_queue(State(state): State<AppState>) -> AdminResult {
    let commands = state.queue.list_pending().await?;
    Ok(Json(json!({ "success": true, "commands": commands })))
}

// =========================================================================
// Directory
// =========================================================================

async fn subject_profile(State(state): State<AppState>, Path(pin): Path<String>) -> AdminResult {
    let profile = state
        .directory
        .subject_profile(&pin)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("Subject not found: {pin}")))?;
    Ok(Json(json!({ "success": true, "subject": profile })))
}

async fn device_subjects(State(state): State<AppState>, Path(sn): Path<String>) -> AdminResult {
    let device = require_device(&state, &sn).await?;
    let subjects = state.directory.subjects_at_device(&sn).await?;
    Ok(Json(json!({
        "success": true,
        "device": device_brief(&device),
        "count": subjects.len(),
        "subjects": subjects,
    })))
}

#[derive(Debug, Deserialize)]
struct FingerprintQuery {
    pin: Option<String>,
    sn: Option<String>,
}

async fn fingerprints(
    State(state): State<AppState>,
    Query(query): Query<FingerprintQuery>,
) -> AdminResult {
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let pin = non_empty(query.pin).ok_or_else(|| AdminError::missing("pin"))?;
    let sn = non_empty(query.sn).ok_or_else(|| AdminError::missing("sn"))?;

    require_device(&state, &sn).await?;
    let fingerprints = state.directory.fingerprints(&pin, Some(&sn)).await?;
    if fingerprints.is_empty() {
        return Err(AdminError::NotFound(format!(
            "No fingerprints found for subject {pin} at device {sn}"
        )));
    }

    Ok(Json(json!({
        "success": true,
        "pin": pin,
        "device": sn,
        "count": fingerprints.len(),
        "fingerprints": fingerprints,
    })))
}
