use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::controllers::movies::date_or_datetime;
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::screening::NewScreening;
use crate::models::{Movie, Screening, ScreeningDetail, Theater};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/screenings", post(create_screening))
        .route("/screenings/{screening_id}", get(read_screening))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScreeningCreate {
    pub movie_id: i32,
    pub theater_id: i32,
    #[serde(deserialize_with = "date_or_datetime")]
    pub screening_time: NaiveDateTime,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub available_seats: Option<i32>,
}

/// A new screening starts with the whole theater free unless told otherwise.
fn initial_available_seats(requested: Option<i32>, total_seats: i32) -> AppResult<i32> {
    match requested {
        None => Ok(total_seats),
        Some(seats) if (0..=total_seats).contains(&seats) => Ok(seats),
        Some(_) => Err(AppError::bad_request(format!(
            "available_seats must be between 0 and {total_seats}"
        ))),
    }
}

// GET /screenings/{screening_id}
async fn read_screening(
    State(state): State<Arc<AppState>>,
    Path(screening_id): Path<i32>,
) -> AppResult<Json<ScreeningDetail>> {
    state
        .cache
        .screening_detail(&state.db.pool, screening_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Screening not found"))
}

// POST /screenings
async fn create_screening(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<ScreeningCreate>,
) -> AppResult<Json<Screening>> {
    req.validate()?;
    let pool = &state.db.pool;

    Movie::find_by_id(pool, req.movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("Movie not found"))?;
    let theater = Theater::find_by_id(pool, req.theater_id)
        .await?
        .ok_or_else(|| AppError::not_found("Theater not found"))?;

    let available_seats = initial_available_seats(req.available_seats, theater.total_seats)?;
    let screening = Screening::create(
        pool,
        &NewScreening {
            movie_id: req.movie_id,
            theater_id: req.theater_id,
            screening_time: req.screening_time,
            price: req.price,
            available_seats,
        },
    )
    .await?;
    state.cache.movie_screenings_changed(screening.movie_id).await;

    info!(
        screening_id = screening.id,
        movie_id = screening.movie_id,
        theater_id = screening.theater_id,
        by = %admin.username,
        "screening scheduled"
    );
    Ok(Json(screening))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seats_default_to_theater_capacity() {
        assert_eq!(initial_available_seats(None, 120).unwrap(), 120);
    }

    #[test]
    fn explicit_seats_must_fit_the_theater() {
        assert_eq!(initial_available_seats(Some(0), 120).unwrap(), 0);
        assert_eq!(initial_available_seats(Some(120), 120).unwrap(), 120);
        assert!(initial_available_seats(Some(121), 120).is_err());
        assert!(initial_available_seats(Some(-1), 120).is_err());
    }

    #[test]
    fn screening_create_parses_and_validates() {
        let req: ScreeningCreate = serde_json::from_value(serde_json::json!({
            "movie_id": 1,
            "theater_id": 2,
            "screening_time": "2025-01-10T19:30:00",
            "price": 12.5
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.available_seats, None);

        let negative: ScreeningCreate = serde_json::from_value(serde_json::json!({
            "movie_id": 1,
            "theater_id": 2,
            "screening_time": "2025-01-10",
            "price": -1.0
        }))
        .unwrap();
        assert!(negative.validate().is_err());
    }
}
