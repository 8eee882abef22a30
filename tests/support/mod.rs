//! Shared fixtures: an in-process router over an in-memory store.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use waypoint::config::ServerConfig;
use waypoint::identity::SessionAuthenticator;
use waypoint::security::{hash_password, RateLimiter};
use waypoint::server::{router, AppState};
use waypoint::storage::SharedStore;

pub const SECRET: &str = "integration-secret-0123456789";

pub struct TestApp {
    pub app: Router,
    pub store: SharedStore,
    pub auth: SessionAuthenticator,
}

pub fn test_app() -> TestApp {
    build(None)
}

/// Same as [`test_app`] with a tight app-wide request budget per client.
pub fn test_app_with_request_limit(requests: u32) -> TestApp {
    build(Some(RateLimiter::new(requests, Duration::from_secs(15 * 60))))
}

fn build(request_limiter: Option<RateLimiter>) -> TestApp {
    let store = SharedStore::in_memory().expect("store");
    let config = ServerConfig {
        http_port: 0,
        db_path: PathBuf::from(":memory:"),
        session_secret: SECRET.to_string(),
        client_url: "http://localhost:5173".to_string(),
        secure_cookies: true,
    };
    let mut state = AppState::new(store.clone(), &config).expect("state");
    if let Some(limiter) = request_limiter {
        state.request_limiter = Arc::new(limiter);
    }
    let auth = SessionAuthenticator::new(SECRET.as_bytes(), true).expect("authenticator");
    TestApp { app: router(state), store, auth }
}

impl TestApp {
    pub fn add_user(&self, username: &str, password: &str, display_name: Option<&str>) -> i64 {
        let hash = hash_password(password).expect("hash");
        self.store.0.lock().create_user(username, &hash, display_name).expect("user")
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let resp = self.app.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.expect("body").to_bytes();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, headers, json)
    }

    /// Log in through the API and return the session token from `Set-Cookie`.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({ "username": username, "password": password });
        let (status, headers, _) = self.send(request(Method::POST, "/api/login", None, Some(body))).await;
        assert_eq!(status, StatusCode::OK, "login for {}", username);
        session_token(&headers).expect("session cookie")
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut b = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        b = b.header(header::COOKIE, format!("token={}", t));
    }
    match body {
        Some(v) => b
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .expect("request"),
        None => b.body(Body::empty()).expect("request"),
    }
}

pub fn set_cookie(headers: &HeaderMap) -> Option<String> {
    headers.get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).map(str::to_string)
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookie = set_cookie(headers)?;
    let first = cookie.split(';').next()?.trim();
    first.strip_prefix("token=").map(str::to_string).filter(|t| !t.is_empty())
}
