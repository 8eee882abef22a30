use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{InvalidHeaderValue, SET_COOKIE};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::{blocking, json_body, AppState};
use crate::error::{AppError, AppResult};
use crate::security;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginPayload {
    username: Option<String>,
    password: Option<String>,
}

fn cookie_error(e: InvalidHeaderValue) -> AppError {
    error!(target: "waypoint::auth", error = %e, "session cookie rejected");
    AppError::internal("cookie_error", "internal error")
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = json_body(payload)?;
    let (Some(username), Some(password)) = (present(payload.username), present(payload.password)) else {
        return Err(AppError::user("missing_credentials", "username and password are required"));
    };
    let username = username.trim().to_string();

    if !state.login_limiter.allow(&username) {
        warn!(target: "waypoint::auth", %username, "login rate limited");
        return Err(AppError::rate_limited("too_many_attempts", "too many login attempts, try again later"));
    }

    let store = state.store.clone();
    let name = username.clone();
    let subject = blocking(move || security::authenticate(&store, &name, &password)).await?;
    let Some(subject) = subject else {
        warn!(target: "waypoint::auth", %username, "login failed");
        return Err(AppError::auth("invalid_credentials", "invalid username or password"));
    };
    state.login_limiter.reset(&username);

    let profile = state.store.0.lock().profile(subject.id)?;
    let token = state.auth.issue(&subject);
    let cookie = state.auth.session_cookie(&token).map_err(cookie_error)?;
    info!(target: "waypoint::auth", user_id = subject.id, "login succeeded");

    let body = json!({
        "username": profile.username,
        "display_name": profile.display_name,
    });
    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

/// Clears the client's cookie. A copied token stays valid until it expires.
pub async fn logout(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let cookie = state.auth.revoke().map_err(cookie_error)?;
    Ok(([(SET_COOKIE, cookie)], Json(json!({ "message": "Logged out" }))))
}
