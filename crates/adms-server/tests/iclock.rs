//! Terminal-facing endpoint tests.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{NaiveDateTime, Utc};

use adms_core::Command;
use adms_core::command::DeleteUser;
use common::{ATTLOG_LINE, TestApp};

#[tokio::test]
async fn root_banner_and_fallback() {
    let app = TestApp::new().await;

    let (status, text) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ADMS Server Ready");

    let (status, text) = app.get("/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(text, "Not Found");
}

#[tokio::test]
async fn missing_serial_is_rejected() {
    let app = TestApp::new().await;

    let (status, text) = app.get("/iclock/cdata?options=all").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "Missing SN");

    let (status, text) = app.post_text("/iclock/cdata?table=ATTLOG", ATTLOG_LINE).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "Invalid request: Missing SN");

    let (status, _) = app.get("/iclock/getrequest?SN=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn handshake_registers_and_lags_unverified_timezone() {
    let app = TestApp::new().await;

    let (status, text) = app
        .get("/iclock/cdata?SN=SIM01&options=all&pushver=2.4.1")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.starts_with("GET OPTION FROM: SIM01\n"));
    assert!(text.contains("\nTimeZone=+02:00\n"), "{text}");
    assert!(text.contains("\nEncrypt=0\n"));

    let device = app.state.registry.get("SIM01").await.unwrap().unwrap();
    assert!(!device.verified);
    assert_eq!(device.status, "online");

    app.verified_device("SIM01").await;
    let (_, text) = app.get("/iclock/cdata?SN=SIM01&options=all").await;
    assert!(text.contains("\nTimeZone=+07:00\n"), "{text}");
}

#[tokio::test]
async fn time_sync_lags_until_verified() {
    let app = TestApp::new().await;

    let (status, text) = app.get("/iclock/cdata?SN=SIM01&type=time").await;
    assert_eq!(status, StatusCode::OK);
    let reported = NaiveDateTime::parse_from_str(
        text.strip_prefix("Time=").unwrap(),
        "%Y-%m-%dT%H:%M:%S",
    )
    .unwrap();
    let lag = Utc::now().naive_utc() - reported;
    assert!((lag.num_seconds() - 5 * 3600).abs() < 60, "lag {lag}");

    app.verified_device("SIM01").await;
    let (_, text) = app.get("/iclock/cdata?SN=SIM01&type=time").await;
    let reported = NaiveDateTime::parse_from_str(
        text.strip_prefix("Time=").unwrap(),
        "%Y-%m-%dT%H:%M:%S",
    )
    .unwrap();
    let lag = Utc::now().naive_utc() - reported;
    assert!(lag.num_seconds().abs() < 60, "lag {lag}");
}

#[tokio::test]
async fn attendance_requires_verification() {
    let app = TestApp::new().await;
    let uri = "/iclock/cdata?SN=SIM01&table=ATTLOG&Stamp=12345";

    let (status, text) = app.post_text(uri, ATTLOG_LINE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ERROR: Device not verified");
    assert_eq!(app.db.count_attendance("SIM01").await.unwrap(), 0);

    let (status, _) = app.admin("POST", "/admin/verify/SIM01", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, text) = app.post_text(uri, ATTLOG_LINE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");

    let rows = app.db.list_attendance("SIM01", 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_pin, "7");
    assert_eq!(rows[0].check_time, "2024-01-01T08:00:00");
}

#[tokio::test]
async fn repeated_upload_stores_once() {
    let app = TestApp::new().await;
    app.verified_device("SIM01").await;
    let uri = "/iclock/cdata?SN=SIM01&table=ATTLOG";

    let body = "7\t2024-01-01 08:00:00\t0\t1\t0\t0\ngarbage line\n8\t2024-01-01 08:05:00\t0\t1\n";
    assert_eq!(app.post_text(uri, body).await.1, "OK");
    assert_eq!(app.post_text(uri, body).await.1, "OK");
    assert_eq!(app.db.count_attendance("SIM01").await.unwrap(), 2);
}

#[tokio::test]
async fn storage_failure_is_answered_ok() {
    let app = TestApp::new().await;
    app.verified_device("SIM01").await;
    sqlx::query("DROP TABLE attendance_logs")
        .execute(app.db.pool())
        .await
        .unwrap();

    let (status, text) = app
        .post_text("/iclock/cdata?SN=SIM01&table=ATTLOG", ATTLOG_LINE)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
}

#[tokio::test]
async fn other_tables_are_acknowledged() {
    let app = TestApp::new().await;
    let (status, text) = app
        .post_text("/iclock/cdata?SN=SIM01&table=ATTPHOTO", "binary-ish")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
}

#[tokio::test]
async fn operation_log_is_synced_for_verified_terminal() {
    let app = TestApp::new().await;
    let body = "USER PIN=336\tName=Rachmat\tPri=0\tPasswd=\tCard=\tGrp=1\tTZ=0000000000000000\n\
                FP PIN=336\tFID=6\tSize=8\tValid=1\tTMP=QUJDRA==\n";

    let (_, text) = app
        .post_text("/iclock/cdata?SN=SIM01&table=OPERLOG", body)
        .await;
    assert_eq!(text, "ERROR: Device not verified");

    app.verified_device("SIM01").await;
    let (_, text) = app
        .post_text("/iclock/cdata?SN=SIM01&table=OPERLOG", body)
        .await;
    assert_eq!(text, "OK");

    let subject = app.db.find_subject("336").await.unwrap().unwrap();
    assert_eq!(subject.name, "Rachmat");
    let fps = app.db.list_fingerprints("336", Some("SIM01")).await.unwrap();
    assert_eq!(fps.len(), 1);
}

#[tokio::test]
async fn queued_delete_user_is_delivered_once() {
    let app = TestApp::new().await;
    app.poll("SIM01").await;
    app.state
        .queue
        .enqueue("SIM01", &Command::DeleteUser(DeleteUser { pin: "42".into() }))
        .await
        .unwrap();

    assert_eq!(app.poll("SIM01").await, "C:10:DATA DEL_USER PIN=42");
    assert_eq!(app.poll("SIM01").await, "OK");
}

#[tokio::test]
async fn first_heartbeat_with_info_requests_sync_once() {
    let app = TestApp::new().await;
    let uri = "/iclock/getrequest?SN=SIM01&INFO=Ver%206.60,35,1200,0,192.168.1.201";

    let (_, first) = app.get(uri).await;
    assert_eq!(first, "C:9:INFO\nC:10:CHECK");
    let (_, second) = app.get(uri).await;
    assert_eq!(second, "OK");

    let device = app.state.registry.get("SIM01").await.unwrap().unwrap();
    assert_eq!(device.fw_version.as_deref(), Some("Ver 6.60"));
    assert_eq!(device.user_count, Some(35));
    assert_eq!(device.transaction_count, Some(1200));
    assert_eq!(device.ip_address.as_deref(), Some("192.168.1.201"));
}

#[tokio::test]
async fn devicecmd_updates_telemetry() {
    let app = TestApp::new().await;
    let (status, text) = app
        .post_text(
            "/iclock/devicecmd?SN=SIM01",
            "~DeviceName=Front Door\nMAC=00:17:61:AA:BB:CC\nUserCount=12\nPlatform=ZMM220_TFT\n",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");

    let device = app.state.registry.get("SIM01").await.unwrap().unwrap();
    assert_eq!(device.name, "Front Door");
    assert_eq!(device.mac.as_deref(), Some("00:17:61:AA:BB:CC"));
    assert_eq!(device.user_count, Some(12));
    assert_eq!(device.platform.as_deref(), Some("ZMM220_TFT"));
}

#[tokio::test]
async fn forwarded_address_is_recorded() {
    let app = TestApp::new().await;
    let request = Request::get("/iclock/getrequest?SN=SIM01")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let device = app.state.registry.get("SIM01").await.unwrap().unwrap();
    assert_eq!(device.ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn non_utf8_upload_is_tolerated() {
    let app = TestApp::new().await;
    app.verified_device("SIM01").await;
    let mut body = b"7\t2024-01-01 08:00:00\t0\t1\t".to_vec();
    body.extend_from_slice(&[0xff, 0xfe, b'\n']);

    let request = Request::post("/iclock/cdata?SN=SIM01&table=ATTLOG")
        .body(Body::from(body))
        .unwrap();
    let (status, text) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
    assert_eq!(app.db.count_attendance("SIM01").await.unwrap(), 1);
}
