//! Registration, login and profile handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{auth_user, issue_token};
use crate::{read_json, AppError, AppState};
use spendwise_core::models::{ProfileUpdate, Registration, User};

/// Request body for login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

/// POST /api/users/register - Create an account
pub async fn register(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<User>), AppError> {
    let req: Registration = read_json(request).await?;

    let user = state.db.register_user(&req)?;

    // Audit log
    state.db.log_audit(
        &user.username,
        "register",
        Some("user"),
        Some(user.id),
        Some(&format!("email={}", user.email)),
    )?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/users/login - Exchange email and password for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<LoginResponse>, AppError> {
    let req: LoginRequest = read_json(request).await?;

    let user = state.db.authenticate(&req.email, &req.password)?;
    let access_token = issue_token(&user, &state.config)?;

    info!(user = %user.username, "User logged in");
    state
        .db
        .log_audit(&user.username, "login", Some("user"), Some(user.id), None)?;

    Ok(Json(LoginResponse { access_token, user }))
}

/// GET /api/users/current-user - Profile of the authenticated user
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<User>, AppError> {
    let auth = auth_user(&request)?;

    let user = state
        .db
        .get_user(auth.id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    // Audit log - read access
    state
        .db
        .log_audit(&auth.username, "view", Some("user"), Some(user.id), None)?;

    Ok(Json(user))
}

/// PUT /api/users/edit-profile - Change username, first or last name
pub async fn edit_profile(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<User>, AppError> {
    let auth = auth_user(&request)?;
    let update: ProfileUpdate = read_json(request).await?;

    let user = state.db.update_profile(auth.id, &update)?;

    // Audit log
    state.db.log_audit(
        &auth.username,
        "update",
        Some("user"),
        Some(user.id),
        Some(&format!("username={}", user.username)),
    )?;

    Ok(Json(user))
}
