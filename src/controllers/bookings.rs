use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{Booking, BookingDetail};
use crate::services::booking::{create_booking, delete_booking};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings).post(book_seats))
        .route("/bookings/{booking_id}", delete(cancel_booking))
}

#[derive(Debug, Deserialize)]
pub struct BookingCreate {
    pub screening_id: i32,
    pub seats: Vec<i32>,
}

// GET /bookings
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    current: AuthUser,
) -> AppResult<Json<Vec<BookingDetail>>> {
    current.require_admin("Not authorized to view all bookings")?;
    Ok(Json(Booking::all_details(&state.db.pool).await?))
}

// POST /bookings
async fn book_seats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<BookingCreate>,
) -> AppResult<Json<BookingDetail>> {
    let pool = &state.db.pool;
    let created = create_booking(pool, user.id, req.screening_id, &req.seats).await?;
    state
        .cache
        .seats_changed(req.screening_id, Some(created.movie_id))
        .await;

    let detail = Booking::detail(pool, created.booking.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("booking {} vanished after commit", created.booking.id)))?;
    Ok(Json(detail))
}

// DELETE /bookings/{booking_id}
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    current: AuthUser,
    Path(booking_id): Path<i32>,
) -> AppResult<StatusCode> {
    let admin = current.require_admin("Not authorized to delete bookings")?;
    let deleted = delete_booking(&state.db.pool, booking_id).await?;
    state
        .cache
        .seats_changed(deleted.booking.screening_id, deleted.movie_id)
        .await;

    info!(booking_id, by = %admin.username, "booking removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
