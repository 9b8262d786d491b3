//! Monthly budget and allocation handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::auth_user;
use crate::{read_json, AppError, AppState};
use spendwise_core::models::{Budget, BudgetAllocation, BudgetWithSavings};
use spendwise_core::period::parse_month;

/// Request body for a new budget
#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    pub date: String,
    pub budget: f64,
}

/// Request body for changing a month's total
#[derive(Debug, Deserialize)]
pub struct EditBudgetRequest {
    pub budget: f64,
}

/// Request body for a category allocation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRequest {
    #[serde(default)]
    pub category_name: String,
    pub budget_amount: f64,
}

/// Response for an allocation: the budget nested beside its savings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    pub updated_budget: Budget,
    pub savings: f64,
}

/// POST /api/users/new-budget - Create a month's budget
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<BudgetWithSavings>), AppError> {
    let auth = auth_user(&request)?;
    let req: CreateBudgetRequest = read_json(request).await?;
    let month = parse_month(&req.date)?;

    let budget = state.db.create_budget(auth.id, month.start, req.budget)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "create",
        Some("budget"),
        Some(budget.id),
        Some(&format!(
            "month={}, budget={}",
            budget.date.format("%Y-%m"),
            budget.budget
        )),
    )?;

    Ok((StatusCode::CREATED, Json(budget.into())))
}

/// GET /api/users/budget/:date - Get a month's budget with its savings
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    request: Request,
) -> Result<Json<BudgetWithSavings>, AppError> {
    let auth = auth_user(&request)?;
    let month = parse_month(&date)?;

    let budget = state
        .db
        .get_budget(auth.id, month.start)?
        .ok_or_else(|| AppError::not_found("Budget not found for the specified date."))?;

    // Audit log - read access
    state
        .db
        .log_audit(&auth.username, "view", Some("budget"), Some(budget.id), None)?;

    Ok(Json(budget.into()))
}

/// PUT /api/users/budget/:date - Change a month's total budget
pub async fn edit_budget(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    request: Request,
) -> Result<Json<BudgetWithSavings>, AppError> {
    let auth = auth_user(&request)?;
    let month = parse_month(&date)?;
    let req: EditBudgetRequest = read_json(request).await?;

    let budget = state.db.edit_budget(auth.id, month.start, req.budget)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "update",
        Some("budget"),
        Some(budget.id),
        Some(&format!("budget={}", budget.budget)),
    )?;

    Ok(Json(budget.into()))
}

/// GET /api/users/budget/:date/:category - One category's allocation
pub async fn get_budget_category(
    State(state): State<Arc<AppState>>,
    Path((date, category)): Path<(String, String)>,
    request: Request,
) -> Result<Json<BudgetAllocation>, AppError> {
    let auth = auth_user(&request)?;
    let month = parse_month(&date)?;

    let allocation = state
        .db
        .get_budget_allocation(auth.id, month.start, &category)?;

    // Audit log - read access
    state.db.log_audit(
        &auth.username,
        "view",
        Some("budget_category"),
        Some(allocation.id),
        None,
    )?;

    Ok(Json(allocation))
}

/// PUT /api/users/budget-category/:date - Allocate part of a month's budget to a category
pub async fn allocate_budget(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    request: Request,
) -> Result<Json<AllocationResponse>, AppError> {
    let auth = auth_user(&request)?;
    let month = parse_month(&date)?;
    let req: AllocateRequest = read_json(request).await?;

    let updated = state
        .db
        .allocate(auth.id, month.start, &req.category_name, req.budget_amount)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "update",
        Some("budget_category"),
        Some(updated.budget.id),
        Some(&format!(
            "category={}, amount={}, savings={}",
            req.category_name, req.budget_amount, updated.savings
        )),
    )?;

    Ok(Json(AllocationResponse {
        updated_budget: updated.budget,
        savings: updated.savings,
    }))
}

/// DELETE /api/users/budget-category/:id - Remove one allocation
pub async fn delete_budget_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<BudgetWithSavings>, AppError> {
    let auth = auth_user(&request)?;
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::bad_request(&format!("Invalid allocation id: {}", id)))?;

    let budget = state.db.delete_allocation(auth.id, id)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "delete",
        Some("budget_category"),
        Some(id),
        None,
    )?;

    Ok(Json(budget.into()))
}
