use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use tracing::info;

use super::{blocking, json_body, AppState};
use crate::error::{AppError, AppResult};
use crate::identity::Subject;
use crate::security;
use crate::storage::{Profile, ProfileUpdate};

pub async fn get_profile(State(state): State<AppState>, Extension(subject): Extension<Subject>) -> AppResult<Json<Profile>> {
    let profile = state.store.0.lock().profile(subject.id)?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Json<Profile>> {
    let mut update = json_body(payload)?;
    let hash = match update.password.take() {
        Some(pw) if pw.is_empty() => return Err(AppError::user("invalid_password", "password cannot be empty")),
        Some(pw) => Some(blocking(move || security::hash_password(&pw).map_err(AppError::from)).await?),
        None => None,
    };
    let profile = state.store.0.lock().update_profile(subject.id, &update, hash.as_deref())?;
    if hash.is_some() {
        info!(target: "waypoint::auth", user_id = subject.id, "password changed");
    }
    Ok(Json(profile))
}
