use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::user::{User, UserChanges, ADMIN_USERNAME};
use crate::models::{Booking, BookingDetail};
use crate::services::auth::hash_password;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(read_me))
        .route("/users/me/bookings", get(my_bookings))
        .route("/users/{user_id}", axum::routing::put(update_user).delete(delete_user))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 255))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

/// Rules that protect the `admin` account from being renamed or demoted.
fn check_admin_account_update(target: &User, update: &UserUpdate) -> AppResult<()> {
    if !target.is_main_admin() {
        return Ok(());
    }
    if update.username.as_deref().is_some_and(|name| name != ADMIN_USERNAME) {
        return Err(AppError::bad_request("Cannot change admin username"));
    }
    if update.is_admin == Some(false) {
        return Err(AppError::bad_request(
            "Cannot remove admin status from main admin account",
        ));
    }
    Ok(())
}

// GET /users/me
async fn read_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

// GET /users
async fn list_users(
    State(state): State<Arc<AppState>>,
    current: AuthUser,
) -> AppResult<Json<Vec<User>>> {
    current.require_admin("Not authorized to view all users")?;
    Ok(Json(User::list(&state.db.pool).await?))
}

// PUT /users/{user_id}
async fn update_user(
    State(state): State<Arc<AppState>>,
    current: AuthUser,
    Path(user_id): Path<i32>,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    let admin = current.require_admin("Not authorized to update users")?;
    update.validate()?;
    let pool = &state.db.pool;

    let target = User::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    check_admin_account_update(&target, &update)?;

    if let Some(username) = &update.username {
        if User::username_taken(pool, username, Some(user_id)).await? {
            return Err(AppError::bad_request("Username already taken"));
        }
    }
    if let Some(email) = &update.email {
        if User::email_taken(pool, email, Some(user_id)).await? {
            return Err(AppError::bad_request("Email already taken"));
        }
    }

    let hashed_password = match update.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(password, state.config.security.bcrypt_cost).await?),
        None => None,
    };

    let changes = UserChanges {
        username: update.username,
        email: update.email,
        hashed_password,
        is_admin: update.is_admin,
    };

    let updated = apply_user_changes(pool, user_id, &changes).await?;
    info!(user_id, by = %admin.username, "user updated");
    Ok(Json(updated))
}

/// Writes `changes` in its own transaction. Any database failure, including
/// a unique-constraint race, is reported as a 400 carrying the database message.
pub async fn apply_user_changes(pool: &PgPool, user_id: i32, changes: &UserChanges) -> AppResult<User> {
    let mut tx = pool.begin().await?;
    let updated = match User::update(&mut *tx, user_id, changes).await {
        Ok(user) => user,
        Err(e) => {
            warn!(user_id, error = %e, "user update failed, rolling back");
            if let Err(rollback) = tx.rollback().await {
                warn!(user_id, error = %rollback, "rollback of user update failed");
            }
            return Err(AppError::bad_request(e.to_string()));
        }
    };
    tx.commit()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    Ok(updated)
}

// DELETE /users/{user_id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(current): AuthUser,
    Path(user_id): Path<i32>,
) -> AppResult<StatusCode> {
    if !current.is_main_admin() {
        warn!(username = %current.username, "user deletion rejected");
        return Err(AppError::forbidden("Not authorized to delete users"));
    }

    let target = User::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if target.is_main_admin() {
        return Err(AppError::bad_request("Cannot delete admin user"));
    }

    User::delete(&state.db.pool, user_id).await?;
    info!(user_id, username = %target.username, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

// GET /users/me/bookings
async fn my_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<BookingDetail>>> {
    Ok(Json(Booking::details_for_user(&state.db.pool, user.id).await?))
}
