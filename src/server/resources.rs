//! Plain owner-scoped CRUD for the trip records that carry no ordering.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use super::{json_body, AppState};
use crate::error::AppResult;
use crate::identity::Subject;
use crate::storage::{Expense, ExpenseInput, ItineraryInput, ItineraryItem, Stay, StayInput};

pub async fn list_itinerary(State(state): State<AppState>, Extension(subject): Extension<Subject>) -> AppResult<Json<Vec<ItineraryItem>>> {
    let items = state.store.0.lock().list_itinerary(subject.id)?;
    Ok(Json(items))
}

pub async fn create_itinerary(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    payload: Result<Json<ItineraryInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ItineraryItem>)> {
    let input = json_body(payload)?;
    let item = state.store.0.lock().create_itinerary(subject.id, &input)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_itinerary(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<i64>,
    payload: Result<Json<ItineraryInput>, JsonRejection>,
) -> AppResult<Json<ItineraryItem>> {
    let input = json_body(payload)?;
    let item = state.store.0.lock().update_itinerary(subject.id, id, &input)?;
    Ok(Json(item))
}

pub async fn delete_itinerary(State(state): State<AppState>, Extension(subject): Extension<Subject>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    state.store.0.lock().delete_itinerary(subject.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_stays(State(state): State<AppState>, Extension(subject): Extension<Subject>) -> AppResult<Json<Vec<Stay>>> {
    let stays = state.store.0.lock().list_stays(subject.id)?;
    Ok(Json(stays))
}

pub async fn create_stay(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    payload: Result<Json<StayInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Stay>)> {
    let input = json_body(payload)?;
    let stay = state.store.0.lock().create_stay(subject.id, &input)?;
    Ok((StatusCode::CREATED, Json(stay)))
}

pub async fn update_stay(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<i64>,
    payload: Result<Json<StayInput>, JsonRejection>,
) -> AppResult<Json<Stay>> {
    let input = json_body(payload)?;
    let stay = state.store.0.lock().update_stay(subject.id, id, &input)?;
    Ok(Json(stay))
}

pub async fn delete_stay(State(state): State<AppState>, Extension(subject): Extension<Subject>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    state.store.0.lock().delete_stay(subject.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_expenses(State(state): State<AppState>, Extension(subject): Extension<Subject>) -> AppResult<Json<Vec<Expense>>> {
    let expenses = state.store.0.lock().list_expenses(subject.id)?;
    Ok(Json(expenses))
}

pub async fn create_expense(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    payload: Result<Json<ExpenseInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let input = json_body(payload)?;
    let expense = state.store.0.lock().create_expense(subject.id, &input)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn delete_expense(State(state): State<AppState>, Extension(subject): Extension<Subject>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    state.store.0.lock().delete_expense(subject.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct BudgetSummary {
    total: f64,
    budget_limit: Option<f64>,
    remaining: Option<f64>,
}

/// Spending so far against the profile's budget limit.
pub async fn expense_summary(State(state): State<AppState>, Extension(subject): Extension<Subject>) -> AppResult<Json<BudgetSummary>> {
    let (total, budget_limit) = {
        let store = state.store.0.lock();
        (store.expense_total(subject.id)?, store.profile(subject.id)?.budget_limit)
    };
    Ok(Json(BudgetSummary { total, budget_limit, remaining: budget_limit.map(|limit| limit - total) }))
}
