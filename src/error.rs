//! Unified application error model and mapping helpers.
//! Every HTTP handler and storage routine reports failures through `AppError`,
//! which knows its HTTP status and renders itself as a JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    RateLimited { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::RateLimited { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::RateLimited { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn rate_limited<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::RateLimited { code: code.into(), message: msg.into() } }
    pub fn io<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// The single response every failed session check produces.
    pub fn not_authenticated() -> Self { AppError::auth("not_authenticated", "not authenticated") }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::RateLimited { .. } => 429,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }

    fn status_label(&self) -> &'static str {
        match self {
            AppError::Auth { .. } => "unauthorized",
            _ => "error",
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(target: "waypoint", code = self.code_str(), "request failed: {}", self.message());
        }
        let body = serde_json::json!({
            "status": self.status_label(),
            "code": self.code_str(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Callers that care downcast before converting; anything else is internal
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => {
                tracing::error!(target: "waypoint", error = %format!("{:#}", other), "internal failure");
                AppError::internal("internal_error", "internal error")
            }
        }
    }
}

// SQLite text names tables and columns; it goes to the log, never to the client
impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => AppError::not_found("not_found", "record not found"),
            rusqlite::Error::SqliteFailure(e, msg) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                tracing::debug!(target: "waypoint::storage", detail = msg.as_deref().unwrap_or_default(), "constraint violation");
                AppError::conflict("conflict", "conflicting record")
            }
            rusqlite::Error::SqliteFailure(e, msg)
                if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) =>
            {
                tracing::warn!(target: "waypoint::storage", detail = msg.as_deref().unwrap_or_default(), "store busy");
                AppError::io("store_busy", "store is busy, retry shortly")
            }
            other => {
                tracing::error!(target: "waypoint::storage", error = %other, "store failure");
                AppError::internal("store_error", "internal storage error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::conflict("conflict", "dup").http_status(), 409);
        assert_eq!(AppError::auth("auth", "no").http_status(), 401);
        assert_eq!(AppError::rate_limited("slow_down", "wait").http_status(), 429);
        assert_eq!(AppError::io("io", "io").http_status(), 503);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn not_authenticated_is_uniform() {
        let e = AppError::not_authenticated();
        assert_eq!(e.http_status(), 401);
        assert_eq!(e.code_str(), "not_authenticated");
        assert_eq!(e.to_string(), "not_authenticated: not authenticated");
    }

    #[test]
    fn sqlite_no_rows_maps_to_not_found() {
        let e: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(e.http_status(), 404);
    }

    #[test]
    fn anyhow_keeps_wrapped_app_error() {
        let e: AppError = anyhow::Error::new(AppError::conflict("conflict", "taken")).into();
        assert_eq!(e.http_status(), 409);
        let e: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(e.code_str(), "internal_error");
    }

    #[test]
    fn storage_failures_do_not_leak_sqlite_text() {
        let e: AppError = rusqlite::Error::InvalidColumnName("secret_col".into()).into();
        assert_eq!(e.http_status(), 500);
        assert_eq!(e.code_str(), "store_error");
        assert!(!e.message().contains("secret_col"));

        let failure = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT);
        let e: AppError = rusqlite::Error::SqliteFailure(failure, Some("UNIQUE constraint failed: users.username".into())).into();
        assert_eq!(e.http_status(), 409);
        assert!(!e.message().contains("users.username"));

        let e: AppError = anyhow::anyhow!("opening /srv/private/trip.db").into();
        assert!(!e.message().contains("/srv/private"));
    }
}
