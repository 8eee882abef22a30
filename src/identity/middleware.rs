use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use super::cookie::{parse_cookie, SESSION_COOKIE};
use super::session::SessionAuthenticator;
use crate::error::AppError;

/// Gate for protected routes.
///
/// Verifies the `token` cookie and attaches the resolved [`super::Subject`] to
/// the request extensions. Every failure answers the same 401 body; the
/// specific reason only reaches the log.
pub async fn require_session(
    State(auth): State<Arc<SessionAuthenticator>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = parse_cookie(req.headers(), SESSION_COOKIE);
    match auth.verify(token.as_deref()) {
        Ok(subject) => {
            debug!(target: "waypoint::auth", user_id = subject.id, path = %req.uri().path(), "session verified");
            req.extensions_mut().insert(subject);
            next.run(req).await
        }
        Err(reason) => {
            warn!(target: "waypoint::auth", path = %req.uri().path(), %reason, "session rejected");
            AppError::not_authenticated().into_response()
        }
    }
}
