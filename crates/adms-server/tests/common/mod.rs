//! Shared harness for the HTTP integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use adms_core::ProtocolConfig;
use adms_server::storage::AdmsDatabase;
use adms_server::{AppState, build_router};

pub const API_KEY: &str = "test-admin-key";

pub const ATTLOG_LINE: &str = "7\t2024-01-01 08:00:00\t0\t1\t0\t0\n";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: AdmsDatabase,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_api_key(Some(API_KEY)).await
    }

    pub async fn with_api_key(key: Option<&str>) -> Self {
        let db = AdmsDatabase::open_in_memory().await.unwrap();
        let state = AppState::new(
            db.clone(),
            ProtocolConfig::default(),
            key.map(str::to_string),
        );
        Self {
            router: build_router(state.clone()),
            state,
            db,
        }
    }

    /// Send a request and return (status, body text).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_text(&self, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::post(uri)
            .header("content-type", "text/plain")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Terminal heartbeat without INFO.
    pub async fn poll(&self, sn: &str) -> String {
        let (status, body) = self.get(&format!("/iclock/getrequest?SN={sn}")).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// Authenticated admin call returning (status, JSON body).
    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.admin_with_key(method, uri, body, Some(API_KEY)).await
    }

    pub async fn admin_with_key(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        key: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, text) = self.send(request).await;
        let json = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, json)
    }

    /// Register a terminal through a handshake, then verify it.
    pub async fn verified_device(&self, sn: &str) {
        self.get(&format!("/iclock/cdata?SN={sn}&options=all")).await;
        let (status, _) = self.admin("POST", &format!("/admin/verify/{sn}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
