//! Spendwise Web Server
//!
//! Axum-based REST API for the Spendwise expense and budget tracker.
//!
//! Security features:
//! - Bearer token (HS256 JWT) authentication on every route except register/login
//! - Restrictive CORS policy
//! - Request body size limits
//! - Full audit logging for all authenticated API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use spendwise_core::db::Database;

mod auth;
mod handlers;

pub use auth::{issue_token, validate_token, AuthUser, Claims};

/// Maximum JSON request body size (64 KB)
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Default lifetime of an access token
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;

/// Environment variable holding the token signing secret
pub const TOKEN_SECRET_ENV: &str = "SPENDWISE_TOKEN_SECRET";

/// Environment variable overriding the token lifetime in minutes
pub const TOKEN_TTL_ENV: &str = "SPENDWISE_TOKEN_TTL_MINUTES";

/// Environment variable with comma-separated allowed CORS origins
pub const ALLOWED_ORIGINS_ENV: &str = "SPENDWISE_ALLOWED_ORIGINS";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// HMAC secret used to sign and validate access tokens
    pub token_secret: String,
    /// Access token lifetime
    pub token_ttl_minutes: i64,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            allowed_origins: vec![],
        }
    }

    /// Build the configuration from `SPENDWISE_*` environment variables
    ///
    /// The token secret is required; the server refuses to start without it.
    pub fn from_env() -> anyhow::Result<Self> {
        let token_secret = std::env::var(TOKEN_SECRET_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("{} must be set to serve the API", TOKEN_SECRET_ENV))?;

        let token_ttl_minutes = match std::env::var(TOKEN_TTL_ENV) {
            Ok(value) => value.trim().parse::<i64>().map_err(|_| {
                anyhow::anyhow!("{} must be a number of minutes, got '{}'", TOKEN_TTL_ENV, value)
            })?,
            Err(_) => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let allowed_origins = std::env::var(ALLOWED_ORIGINS_ENV)
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        Ok(Self {
            token_secret,
            token_ttl_minutes,
            allowed_origins,
        })
    }
}

/// Split a comma-separated origin list
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let state = Arc::new(AppState { db, config });

    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let protected_routes = Router::new()
        // Users
        .route("/current-user", get(handlers::current_user))
        .route("/currentUser", get(handlers::current_user))
        .route("/edit-profile", put(handlers::edit_profile))
        // Categories
        .route(
            "/category",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/category/subcategory",
            get(handlers::list_sub_categories).post(handlers::create_sub_category),
        )
        .route("/category/categories", get(handlers::list_sub_categories))
        .route(
            "/category/subcategory/:id",
            put(handlers::rename_sub_category).delete(handlers::delete_sub_category),
        )
        // Expenses
        .route("/expenses", post(handlers::create_expense_day))
        .route(
            "/expenses/:date",
            get(handlers::get_expense_day).delete(handlers::delete_expense_day),
        )
        .route("/expenses/:date/add", post(handlers::append_expense_item))
        .route(
            "/expense/:id",
            get(handlers::get_expense_item)
                .put(handlers::edit_expense_item)
                .delete(handlers::delete_expense_item),
        )
        .route("/user-expenses", get(handlers::list_all_expenses))
        .route(
            "/user-expenses/current",
            get(handlers::list_current_month_expenses),
        )
        .route(
            "/user-expenses/current-week",
            get(handlers::list_current_week_expenses),
        )
        .route(
            "/user-expenses/:period",
            get(handlers::list_period_expenses),
        )
        .route(
            "/user-expenses/:period/:week",
            get(handlers::list_week_expenses),
        )
        // Budgets
        .route("/new-budget", post(handlers::create_budget))
        .route(
            "/budget/:date",
            get(handlers::get_budget).put(handlers::edit_budget),
        )
        .route(
            "/budget/:date/:category",
            get(handlers::get_budget_category),
        )
        // PUT takes a month, DELETE an allocation id
        .route(
            "/budget-category/:key",
            put(handlers::allocate_budget).delete(handlers::delete_budget_category),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    // Security headers
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .nest("/api/users", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server with the given configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.allowed_origins.is_empty() {
        info!("CORS: same-origin only");
    } else {
        info!(origins = ?config.allowed_origins, "CORS: allowing configured origins");
    }
    if config.token_secret.len() < 32 {
        warn!("⚠️  Token secret is shorter than 32 bytes - use a longer random value");
    }

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Read and deserialize a JSON request body
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    /// Duplicate day or month bucket
    pub fn forbidden(msg: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "message": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Domain errors carry a message meant for the caller
        if let Some(domain) = err.downcast_ref::<spendwise_core::Error>() {
            use spendwise_core::Error as DomainError;
            let client_error = match domain {
                DomainError::Validation(msg) => Some(Self::bad_request(msg)),
                DomainError::NotFound(msg) => Some(Self::not_found(msg)),
                DomainError::Conflict(msg) => Some(Self::forbidden(msg)),
                DomainError::Unauthorized(msg) => Some(Self::unauthorized(msg)),
                _ => None,
            };
            if let Some(client_error) = client_error {
                return client_error;
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
