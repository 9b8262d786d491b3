//! Category and sub-category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::auth_user;
use crate::{read_json, AppError, AppState};
use spendwise_core::models::{Category, SubCategory};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub category_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSubCategoryRequest {
    pub sub_category_name: String,
    pub category_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenameSubCategoryRequest {
    pub sub_category_name: String,
}

/// A renamed sub-category and how many expense lines picked up the new name
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedSubCategory {
    #[serde(flatten)]
    pub sub_category: SubCategory,
    pub updated_expenses: usize,
}

/// GET /api/users/category - List all categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Category>>, AppError> {
    let auth = auth_user(&request)?;

    let categories = state.db.list_categories()?;

    // Audit log - read access
    state.db.log_audit(
        &auth.username,
        "list",
        Some("category"),
        None,
        Some(&format!("count={}", categories.len())),
    )?;

    Ok(Json(categories))
}

/// POST /api/users/category - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let auth = auth_user(&request)?;
    let req: CreateCategoryRequest = read_json(request).await?;

    let category = state.db.create_category(&req.category_name)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "create",
        Some("category"),
        Some(category.id),
        Some(&format!("name={}", category.category_name)),
    )?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/users/category/subcategory - List the user's sub-categories
pub async fn list_sub_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<SubCategory>>, AppError> {
    let auth = auth_user(&request)?;

    let subs = state.db.list_sub_categories(auth.id)?;

    // Audit log - read access
    state.db.log_audit(
        &auth.username,
        "list",
        Some("sub_category"),
        None,
        Some(&format!("count={}", subs.len())),
    )?;

    Ok(Json(subs))
}

/// POST /api/users/category/subcategory - Create a sub-category
pub async fn create_sub_category(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<SubCategory>), AppError> {
    let auth = auth_user(&request)?;
    let req: CreateSubCategoryRequest = read_json(request).await?;

    let sub = state
        .db
        .create_sub_category(auth.id, &req.sub_category_name, &req.category_name)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "create",
        Some("sub_category"),
        Some(sub.id),
        Some(&format!(
            "name={}, category={}",
            sub.sub_category_name, sub.category_name
        )),
    )?;

    Ok((StatusCode::CREATED, Json(sub)))
}

/// PUT /api/users/category/subcategory/:id - Rename a sub-category
pub async fn rename_sub_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<RenamedSubCategory>, AppError> {
    let auth = auth_user(&request)?;
    let req: RenameSubCategoryRequest = read_json(request).await?;

    let (sub_category, updated_expenses) =
        state.db.rename_sub_category(auth.id, id, &req.sub_category_name)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "update",
        Some("sub_category"),
        Some(id),
        Some(&format!(
            "name={}, expenses={}",
            sub_category.sub_category_name, updated_expenses
        )),
    )?;

    Ok(Json(RenamedSubCategory {
        sub_category,
        updated_expenses,
    }))
}

/// DELETE /api/users/category/subcategory/:id - Delete a sub-category
pub async fn delete_sub_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SubCategory>, AppError> {
    let auth = auth_user(&request)?;

    let sub = state.db.delete_sub_category(auth.id, id)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "delete",
        Some("sub_category"),
        Some(id),
        Some(&format!("name={}", sub.sub_category_name)),
    )?;

    Ok(Json(sub))
}
