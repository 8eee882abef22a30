use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::{json_body, AppState};
use crate::error::{AppError, AppResult};
use crate::identity::Subject;
use crate::ordering::TaskStatus;
use crate::storage::{NewTodo, Todo, TodoUpdate};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TodoPatch {
    title: Option<String>,
    status: Option<String>,
    due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MovePayload {
    status: String,
    index: usize,
}

/// Group names arrive as free text; anything outside the fixed set is a 400.
fn parse_status(s: &str) -> AppResult<TaskStatus> {
    s.parse::<TaskStatus>().map_err(|e| AppError::user("invalid_status", e.to_string()))
}

pub async fn list(State(state): State<AppState>, Extension(subject): Extension<Subject>) -> AppResult<Json<Vec<Todo>>> {
    let todos = state.store.0.lock().list_todos(subject.id)?;
    Ok(Json(todos))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    payload: Result<Json<NewTodo>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Todo>)> {
    let new = json_body(payload)?;
    let todo = state.store.0.lock().create_todo(subject.id, &new)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<i64>,
    payload: Result<Json<TodoPatch>, JsonRejection>,
) -> AppResult<Json<Todo>> {
    let patch = json_body(payload)?;
    let update = TodoUpdate {
        title: patch.title,
        status: patch.status.as_deref().map(parse_status).transpose()?,
        due_date: patch.due_date,
    };
    let todo = state.store.0.lock().update_todo(subject.id, id, &update)?;
    Ok(Json(todo))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.store.0.lock().delete_todo(subject.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drop a task into `status` at `index`; only the moved row is written.
pub async fn move_todo(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<i64>,
    payload: Result<Json<MovePayload>, JsonRejection>,
) -> AppResult<Json<Todo>> {
    let mv = json_body(payload)?;
    let status = parse_status(&mv.status)?;
    let todo = state.store.0.lock().move_todo(subject.id, id, status, mv.index)?;
    Ok(Json(todo))
}
