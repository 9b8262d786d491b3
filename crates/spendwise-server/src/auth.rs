//! Bearer token authentication
//!
//! `POST /login` issues an HS256 JWT signed with the configured secret. Every
//! other route runs behind [`auth_middleware`], which validates the token,
//! loads the user it names and attaches an [`AuthUser`] to the request.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use spendwise_core::models::User;

use crate::{AppError, AppState, ServerConfig};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub username: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// The user a request was authenticated as
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Sign an access token for `user`
pub fn issue_token(user: &User, config: &ServerConfig) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        email: user.email.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(config.token_ttl_minutes)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.token_secret.as_bytes()),
    )
}

/// Validate a token's signature and expiry
pub fn validate_token(token: &str, secret: &str) -> Result<AuthUser, String> {
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| format!("JWT validation failed: {}", e))?;

    let claims = token_data.claims;
    let id = claims
        .sub
        .parse()
        .map_err(|_| format!("Invalid subject: {}", claims.sub))?;

    Ok(AuthUser {
        id,
        username: claims.username,
        email: claims.email,
    })
}

/// Authentication middleware - requires `Authorization: Bearer <token>`
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        warn!(path = %request.uri().path(), "Unauthorized request - token missing");
        return unauthorized("User is not authorized or token is missing");
    };

    let claimed = match validate_token(token, &state.config.token_secret) {
        Ok(claimed) => claimed,
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "Invalid bearer token");
            return unauthorized("User is not authorized");
        }
    };

    // Profile edits change the username after the token was issued
    let user = match state.db.get_user(claimed.id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(user_id = claimed.id, "Bearer token for a deleted user");
            return unauthorized("User is not authorized");
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    debug!(user = %user.username, path = %request.uri().path(), "Authenticated via bearer token");
    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
        email: user.email,
    });
    next.run(request).await
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "message": message })),
    )
        .into_response()
}

/// Get the authenticated user attached by [`auth_middleware`]
pub fn auth_user(request: &Request) -> Result<AuthUser, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::unauthorized("User is not authorized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: i64) -> ServerConfig {
        ServerConfig {
            token_ttl_minutes: ttl,
            ..ServerConfig::new("test-secret")
        }
    }

    fn user() -> User {
        User {
            id: 42,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            first_name: None,
            last_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = issue_token(&user(), &config(60)).unwrap();
        let auth = validate_token(&token, "test-secret").unwrap();
        assert_eq!(auth.id, 42);
        assert_eq!(auth.username, "alice");
        assert_eq!(auth.email, "alice@example.com");
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = issue_token(&user(), &config(60)).unwrap();
        assert!(validate_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_token_expired() {
        // Well past the default 60s leeway
        let token = issue_token(&user(), &config(-10)).unwrap();
        assert!(validate_token(&token, "test-secret").is_err());
    }

    #[test]
    fn test_garbage_token() {
        assert!(validate_token("not.a.jwt", "test-secret").is_err());
    }
}
