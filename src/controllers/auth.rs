use axum::{extract::State, routing::post, Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::{User, UserSummary};
use crate::services::auth::{authenticate, hash_password};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/register", post(register))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self { access_token, token_type: "bearer".to_string() }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "username must be 1-255 characters"))]
    pub username: String,
    #[validate(email(message = "email is not valid"), length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

// POST /login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    req.validate()?;
    let user = authenticate(&state.db.pool, &req.username, &req.password)
        .await
        .inspect_err(|_| warn!(username = %req.username, "login failed"))?;

    let token = state.jwt.issue(&user.username)?;
    info!(user_id = user.id, "user logged in");

    Ok(Json(LoginResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

// POST /token (OAuth2 password form)
async fn token(
    State(state): State<Arc<AppState>>,
    Form(req): Form<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    req.validate()?;
    let user = authenticate(&state.db.pool, &req.username, &req.password).await?;
    Ok(Json(TokenResponse::bearer(state.jwt.issue(&user.username)?)))
}

// POST /register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    req.validate()?;
    let pool = &state.db.pool;

    if User::username_taken(pool, &req.username, None).await? {
        warn!(username = %req.username, "username already registered");
        return Err(AppError::bad_request("Username already registered"));
    }
    if User::email_taken(pool, &req.email, None).await? {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::bad_request("Email already registered"));
    }

    let hashed = hash_password(&req.password, state.config.security.bcrypt_cost).await?;
    let user = User::create(pool, &req.username, &req.email, &hashed, false)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::bad_request("Username or email already registered")
            } else {
                AppError::Database(e)
            }
        })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Json(TokenResponse::bearer(state.jwt.issue(&user.username)?)))
}
