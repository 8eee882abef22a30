//!
//! waypoint HTTP server
//! --------------------
//! This module defines the axum-based REST API for waypoint.
//!
//! Responsibilities:
//! - Login/logout endpoints issuing and clearing the stateless session cookie.
//! - The session gate in front of every other `/api` route; handlers read the
//!   verified `Subject` from request extensions and scope all data access to it.
//! - Profile, task board, itinerary, stays and expense endpoints over the store.
//! - CORS for the configured client origin, a body size limit, a per-client
//!   request limit and a tracing span per request.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{require_session, SessionAuthenticator};
use crate::security::RateLimiter;
use crate::storage::SharedStore;

mod auth;
mod profile;
mod todos;
mod resources;

pub const MAX_BODY_BYTES: usize = 10 * 1024;

const REQUEST_ID: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub auth: Arc<SessionAuthenticator>,
    pub login_limiter: Arc<RateLimiter>,
    pub request_limiter: Arc<RateLimiter>,
    pub client_origin: HeaderValue,
}

impl AppState {
    pub fn new(store: SharedStore, config: &ServerConfig) -> anyhow::Result<Self> {
        let auth = SessionAuthenticator::new(config.session_secret.as_bytes(), config.secure_cookies)?;
        let client_origin = HeaderValue::from_str(&config.client_url)
            .with_context(|| format!("client url '{}' is not a valid origin", config.client_url))?;
        Ok(Self {
            store,
            auth: Arc::new(auth),
            login_limiter: Arc::new(RateLimiter::login()),
            request_limiter: Arc::new(RateLimiter::requests()),
            client_origin,
        })
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(profile::get_profile).put(profile::update_profile))
        .route("/todos", get(todos::list).post(todos::create))
        .route("/todos/{id}", put(todos::update).delete(todos::remove))
        .route("/todos/{id}/move", post(todos::move_todo))
        .route("/itinerary", get(resources::list_itinerary).post(resources::create_itinerary))
        .route("/itinerary/{id}", put(resources::update_itinerary).delete(resources::delete_itinerary))
        .route("/stays", get(resources::list_stays).post(resources::create_stay))
        .route("/stays/{id}", put(resources::update_stay).delete(resources::delete_stay))
        .route("/expenses", get(resources::list_expenses).post(resources::create_expense))
        .route("/expenses/summary", get(resources::expense_summary))
        .route("/expenses/{id}", delete(resources::delete_expense))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_session));

    let public = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let cors = CorsLayer::new()
        .allow_origin(state.client_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(|| async { "waypoint ok" }))
        .nest("/api", public.merge(protected))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(state.request_limiter.clone(), limit_requests))
        .layer(middleware::from_fn(trace_requests))
        .layer(cors)
        .with_state(state)
}

/// One span per request carrying a fresh request id, echoed back to the client.
async fn trace_requests(req: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!(
        target: "waypoint",
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id,
    );
    async move {
        let started = Instant::now();
        let mut resp = next.run(req).await;
        let status = resp.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status.is_server_error() {
            warn!(target: "waypoint", status = status.as_u16(), elapsed_ms, "request failed");
        } else {
            info!(target: "waypoint", status = status.as_u16(), elapsed_ms, "request done");
        }
        if let Ok(v) = HeaderValue::from_str(&request_id) {
            resp.headers_mut().insert(REQUEST_ID, v);
        }
        resp
    }
    .instrument(span)
    .await
}

/// App-wide request budget per client address. Requests without a known peer
/// (in-process callers) share one bucket.
async fn limit_requests(State(limiter): State<Arc<RateLimiter>>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    if !limiter.allow(&client) {
        warn!(target: "waypoint", %client, "request rate limited");
        return AppError::rate_limited("too_many_requests", "too many requests, try again later").into_response();
    }
    next.run(req).await
}

/// Unwrap a JSON body, answering 400 instead of axum's default rejection.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match payload {
        Ok(Json(v)) => Ok(v),
        Err(rej) => Err(AppError::user("invalid_body", rej.body_text())),
    }
}

/// Run a CPU-heavy closure (password hashing) off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!(target: "waypoint", error = %e, "blocking worker failed");
            AppError::internal("worker_failed", "internal error")
        })?
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let store = SharedStore::open(&config.db_path)
        .with_context(|| format!("while opening store at {}", config.db_path.display()))?;
    let state = AppState::new(store, &config)?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(
        target: "waypoint",
        "waypoint starting: http={}, db='{}', client='{}', secure_cookies={}",
        addr, config.db_path.display(), config.client_url, config.secure_cookies
    );
    if !config.secure_cookies {
        warn!(target: "waypoint", "session cookies are not marked Secure; use only for local development");
    }
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(target: "waypoint", "shutdown requested");
        })
        .await?;
    Ok(())
}
