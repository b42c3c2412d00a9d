//! Booking lifecycle: create (take seats) and delete (give seats back).
//!
//! Both operations run in one transaction. The read of the screening is only
//! used to tell "not found" apart from "not enough seats"; the decrement itself
//! is the guarded `UPDATE ... WHERE available_seats >= n`, so a booking that
//! lost a race against another one fails with the same insufficient-seats
//! error instead of overselling.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus, NewBooking};
use crate::models::Screening;
use crate::services::inventory::{self, InventoryError};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Screening not found")]
    ScreeningNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::ScreeningNotFound | BookingError::BookingNotFound => {
                AppError::not_found(err.to_string())
            }
            BookingError::Inventory(e) => AppError::bad_request(e.to_string()),
            BookingError::Database(e) => AppError::Database(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub movie_id: i32,
    pub remaining_seats: i32,
}

#[derive(Debug, Clone)]
pub struct DeletedBooking {
    pub booking: Booking,
    /// `None` when the screening no longer exists.
    pub movie_id: Option<i32>,
    pub remaining_seats: Option<i32>,
}

pub async fn create_booking(
    pool: &PgPool,
    user_id: i32,
    screening_id: i32,
    seats: &[i32],
) -> Result<CreatedBooking, BookingError> {
    let mut tx = pool.begin().await?;

    let screening = Screening::find_by_id(&mut *tx, screening_id)
        .await?
        .ok_or(BookingError::ScreeningNotFound)?;

    let reservation = inventory::reserve(screening.available_seats, screening.price, seats)?;

    let Some(remaining_seats) =
        Screening::take_seats(&mut *tx, screening_id, reservation.seat_count).await?
    else {
        warn!(
            screening_id,
            requested = reservation.seat_count,
            "seats were taken by a concurrent booking"
        );
        return Err(InventoryError::InsufficientSeats {
            requested: seats.len(),
            available: screening.available_seats,
        }
        .into());
    };

    let booking = Booking::insert(
        &mut *tx,
        &NewBooking {
            user_id,
            screening_id,
            seats,
            total_amount: reservation.total_amount,
            status: BookingStatus::Confirmed,
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        booking_id = booking.id,
        user_id,
        screening_id,
        seats = reservation.seat_count,
        remaining_seats,
        total_amount = booking.total_amount,
        "booking created"
    );

    Ok(CreatedBooking {
        booking,
        movie_id: screening.movie_id,
        remaining_seats,
    })
}

pub async fn delete_booking(pool: &PgPool, booking_id: i32) -> Result<DeletedBooking, BookingError> {
    let mut tx = pool.begin().await?;

    let booking = Booking::find_by_id(&mut *tx, booking_id)
        .await?
        .ok_or(BookingError::BookingNotFound)?;

    let screening = Screening::find_by_id(&mut *tx, booking.screening_id).await?;
    let remaining_seats = match &screening {
        Some(s) => {
            Screening::return_seats(&mut *tx, s.id, inventory::seat_delta(booking.seat_count())).await?
        }
        None => None,
    };

    Booking::delete(&mut *tx, booking_id).await?;
    tx.commit().await?;

    info!(
        booking_id,
        screening_id = booking.screening_id,
        seats = booking.seat_count(),
        remaining_seats,
        "booking deleted"
    );

    Ok(DeletedBooking {
        movie_id: screening.map(|s| s.movie_id),
        booking,
        remaining_seats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn missing_entities_map_to_404() {
        let err: AppError = BookingError::ScreeningNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Screening not found");

        let err: AppError = BookingError::BookingNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Booking not found");
    }

    #[test]
    fn inventory_failures_map_to_400() {
        let err: AppError = BookingError::from(InventoryError::InsufficientSeats {
            requested: 5,
            available: 2,
        })
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Not enough seats available");
    }

    #[test]
    fn database_failures_map_to_500() {
        let err: AppError = BookingError::from(sqlx::Error::PoolClosed).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
