//! Terminal-facing `/iclock/*` endpoints.
//!
//! Bodies are plain text. Apart from a missing serial, every request is
//! answered 200; failures are logged and hidden behind `OK`.

use std::convert::Infallible;
use std::net::SocketAddr;

use adms_core::clock::lagged_clock;
use adms_core::codec::{self, DeviceTelemetry, decode_key_value_blob, encode_handshake, encode_time};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, DefaultBodyLimit, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::dispatcher::Poll;
use crate::ingest::UploadTable;
use crate::state::AppState;

/// Terminals upload large ATTLOG/OPERLOG backlogs after a reupload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const MISSING_SN: &str = "Missing SN";
const INVALID_REQUEST: &str = "Invalid request: Missing SN";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/iclock/cdata", get(cdata_get).post(cdata_post))
        .route("/iclock/getrequest", get(getrequest))
        .route("/iclock/devicecmd", post(devicecmd))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Query string shared by all iclock endpoints. Unknown keys such as
/// `Stamp` or `pushver` are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct IclockQuery {
    #[serde(rename = "SN")]
    sn: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    table: Option<String>,
    #[serde(rename = "INFO")]
    info: Option<String>,
}

impl IclockQuery {
    fn serial(&self) -> Option<&str> {
        self.sn.as_deref().map(str::trim).filter(|sn| !sn.is_empty())
    }
}

/// Peer address: first `X-Forwarded-For` hop, else the socket address.
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        Ok(Self(ip))
    }
}

fn text(body: impl Into<String>) -> Response {
    (StatusCode::OK, body.into()).into_response()
}

/// `GET /iclock/cdata`: handshake, or time sync with `type=time`.
pub async fn cdata_get(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<IclockQuery>,
) -> Response {
    let Some(sn) = query.serial() else {
        return (StatusCode::BAD_REQUEST, MISSING_SN).into_response();
    };
    state.registry.record_contact(sn, ip.as_deref()).await;

    if query.kind.as_deref() == Some("time") {
        let lag = state.registry.clock_lag_hours(sn).await;
        return text(encode_time(lagged_clock(Utc::now(), lag)));
    }

    let timezone = state.registry.advertised_timezone(sn).await;
    debug!(device_sn = %sn, timezone = %timezone, "Handshake");
    text(encode_handshake(sn, &timezone))
}

/// `POST /iclock/cdata`: ATTLOG / OPERLOG uploads.
pub async fn cdata_post(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<IclockQuery>,
    body: Bytes,
) -> Response {
    let Some(sn) = query.serial() else {
        return (StatusCode::BAD_REQUEST, INVALID_REQUEST).into_response();
    };
    state.registry.record_contact(sn, ip.as_deref()).await;

    let table = UploadTable::from_query(query.table.as_deref());
    let raw = String::from_utf8_lossy(&body);
    let outcome = state.ingest.accept(sn, &table, &raw).await;
    text(outcome.wire_response())
}

/// `GET /iclock/getrequest`: heartbeat and command delivery.
pub async fn getrequest(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<IclockQuery>,
) -> Response {
    let Some(sn) = query.serial() else {
        return (StatusCode::BAD_REQUEST, MISSING_SN).into_response();
    };

    let outcome = state
        .dispatcher
        .poll(Poll {
            sn,
            ip_address: ip.as_deref(),
            info: query.info.as_deref(),
        })
        .await;
    text(outcome.body())
}

/// `POST /iclock/devicecmd`: terminal info blob.
pub async fn devicecmd(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<IclockQuery>,
    body: Bytes,
) -> Response {
    let Some(sn) = query.serial() else {
        return (StatusCode::BAD_REQUEST, MISSING_SN).into_response();
    };
    state.registry.record_contact(sn, ip.as_deref()).await;

    let pairs = decode_key_value_blob(&String::from_utf8_lossy(&body));
    let telemetry = DeviceTelemetry::from_key_values(&pairs);
    state.registry.apply_telemetry(sn, &telemetry).await;

    text(codec::OK)
}
