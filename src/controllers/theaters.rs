use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::models::Theater;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/theaters", get(list_theaters).post(create_theater))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TheaterCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 1))]
    pub total_seats: i32,
}

async fn list_theaters(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Theater>>> {
    Ok(Json(Theater::list(&state.db.pool).await?))
}

async fn create_theater(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<TheaterCreate>,
) -> AppResult<Json<Theater>> {
    req.validate()?;
    let theater = Theater::create(&state.db.pool, req.name.trim(), req.total_seats).await?;
    info!(theater_id = theater.id, total_seats = theater.total_seats, by = %admin.username, "theater created");
    Ok(Json(theater))
}
