//! Expense day and line item handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::Deserialize;

use crate::auth::{auth_user, AuthUser};
use crate::{read_json, AppError, AppState};
use spendwise_core::models::{ExpenseDay, ExpenseItem, NewExpenseItem};
use spendwise_core::period::{parse_date, parse_month, parse_year_or_month};
use spendwise_core::DateRange;

/// Request body for creating a day's expenses
#[derive(Debug, Deserialize)]
pub struct CreateExpensesRequest {
    pub date: String,
    #[serde(default)]
    pub expenses: Vec<NewExpenseItem>,
}

/// POST /api/users/expenses - Create the bucket for a date with its first lines
pub async fn create_expense_day(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<ExpenseDay>), AppError> {
    let auth = auth_user(&request)?;
    let req: CreateExpensesRequest = read_json(request).await?;
    let date = parse_date(&req.date)?;

    let day = state.db.create_expense_day(auth.id, date, &req.expenses)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "create",
        Some("expense_day"),
        Some(day.id),
        Some(&format!(
            "date={}, items={}, total={}",
            day.date,
            day.expenses.len(),
            day.total
        )),
    )?;

    Ok((StatusCode::CREATED, Json(day)))
}

/// GET /api/users/expenses/:date - Get the bucket for a date
pub async fn get_expense_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    request: Request,
) -> Result<Json<ExpenseDay>, AppError> {
    let auth = auth_user(&request)?;
    let date = parse_date(&date)?;

    let day = state
        .db
        .get_expense_day(auth.id, date)?
        .ok_or_else(|| AppError::not_found("No expenses found for the specified date."))?;

    // Audit log - read access
    state.db.log_audit(
        &auth.username,
        "view",
        Some("expense_day"),
        Some(day.id),
        None,
    )?;

    Ok(Json(day))
}

/// DELETE /api/users/expenses/:date - Delete the bucket for a date
pub async fn delete_expense_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    request: Request,
) -> Result<Json<ExpenseDay>, AppError> {
    let auth = auth_user(&request)?;
    let date = parse_date(&date)?;

    let day = state.db.delete_expense_day(auth.id, date)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "delete",
        Some("expense_day"),
        Some(day.id),
        Some(&format!("date={}, total={}", day.date, day.total)),
    )?;

    Ok(Json(day))
}

/// POST /api/users/expenses/:date/add - Append a line to an existing bucket
pub async fn append_expense_item(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    request: Request,
) -> Result<(StatusCode, Json<ExpenseDay>), AppError> {
    let auth = auth_user(&request)?;
    let date = parse_date(&date)?;
    let item: NewExpenseItem = read_json(request).await?;

    let day = state.db.append_expense_item(auth.id, date, &item)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "create",
        Some("expense_item"),
        day.expenses.last().map(|e| e.id),
        Some(&format!("date={}, total={}", day.date, day.total)),
    )?;

    Ok((StatusCode::CREATED, Json(day)))
}

/// GET /api/users/expense/:id - Get one line item
pub async fn get_expense_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ExpenseItem>, AppError> {
    let auth = auth_user(&request)?;

    let item = state
        .db
        .get_expense_item(auth.id, id)?
        .ok_or_else(|| AppError::not_found("Expense not found."))?;

    // Audit log - read access
    state
        .db
        .log_audit(&auth.username, "view", Some("expense_item"), Some(id), None)?;

    Ok(Json(item))
}

/// PUT /api/users/expense/:id - Replace one line item
pub async fn edit_expense_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ExpenseDay>, AppError> {
    let auth = auth_user(&request)?;
    let item: NewExpenseItem = read_json(request).await?;

    let day = state.db.edit_expense_item(auth.id, id, &item)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "update",
        Some("expense_item"),
        Some(id),
        Some(&format!("date={}, total={}", day.date, day.total)),
    )?;

    Ok(Json(day))
}

/// DELETE /api/users/expense/:id - Remove one line item
pub async fn delete_expense_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ExpenseDay>, AppError> {
    let auth = auth_user(&request)?;

    let day = state.db.delete_expense_item(auth.id, id)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "delete",
        Some("expense_item"),
        Some(id),
        Some(&format!("date={}, total={}", day.date, day.total)),
    )?;

    Ok(Json(day))
}

/// GET /api/users/user-expenses - All of the user's buckets
pub async fn list_all_expenses(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<ExpenseDay>>, AppError> {
    let auth = auth_user(&request)?;
    list_expenses(&state, &auth, None, "all").map(Json)
}

/// GET /api/users/user-expenses/current - Buckets in the current month
pub async fn list_current_month_expenses(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<ExpenseDay>>, AppError> {
    let auth = auth_user(&request)?;
    let range = DateRange::month_of(Local::now().date_naive());
    list_expenses(&state, &auth, Some(range), "current-month").map(Json)
}

/// GET /api/users/user-expenses/current-week - Buckets in the current Sunday-Saturday week
pub async fn list_current_week_expenses(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<ExpenseDay>>, AppError> {
    let auth = auth_user(&request)?;
    let range = DateRange::week_of(Local::now().date_naive());
    list_expenses(&state, &auth, Some(range), "current-week").map(Json)
}

/// GET /api/users/user-expenses/:period - Buckets in a year (`YYYY`) or month (`YYYY-MM`)
pub async fn list_period_expenses(
    State(state): State<Arc<AppState>>,
    Path(period): Path<String>,
    request: Request,
) -> Result<Json<Vec<ExpenseDay>>, AppError> {
    let auth = auth_user(&request)?;
    let range = parse_year_or_month(&period)?;
    list_expenses(&state, &auth, Some(range), &period).map(Json)
}

/// GET /api/users/user-expenses/:period/:week - Buckets in week N of a month
pub async fn list_week_expenses(
    State(state): State<Arc<AppState>>,
    Path((period, week)): Path<(String, String)>,
    request: Request,
) -> Result<Json<Vec<ExpenseDay>>, AppError> {
    let auth = auth_user(&request)?;
    let month = parse_month(&period)?;
    let week: u32 = week
        .parse()
        .map_err(|_| AppError::bad_request(&format!("Invalid week number: {}", week)))?;
    let range = DateRange::week_of_month(month.start, week)?;
    list_expenses(&state, &auth, Some(range), &format!("{} week {}", period, week)).map(Json)
}

/// Shared listing: an empty window is reported as not found
fn list_expenses(
    state: &AppState,
    auth: &AuthUser,
    range: Option<DateRange>,
    label: &str,
) -> Result<Vec<ExpenseDay>, AppError> {
    let days = state.db.list_expense_days(auth.id, range)?;

    // Audit log - read access
    state.db.log_audit(
        &auth.username,
        "list",
        Some("expense_day"),
        None,
        Some(&format!("period={}, count={}", label, days.len())),
    )?;

    if days.is_empty() {
        return Err(AppError::not_found(
            "No expenses found for the specified period.",
        ));
    }

    Ok(days)
}
