//! Seat-counter arithmetic for a screening.
//!
//! A screening only tracks how many seats are left, not which ones. Booking
//! takes `len(seats)` from the counter, deleting a booking gives the same
//! amount back. Seat indices themselves are not checked for overlap with
//! other bookings.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InventoryError {
    #[error("Not enough seats available")]
    InsufficientSeats { requested: usize, available: i32 },
}

/// Outcome of a successful reservation check.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub seat_count: i32,
    pub total_amount: f64,
}

/// Checks `seats` against the counter and prices the booking. An empty
/// request fits any screening and costs nothing.
pub fn reserve(available: i32, price: f64, seats: &[i32]) -> Result<Reservation, InventoryError> {
    let insufficient = InventoryError::InsufficientSeats {
        requested: seats.len(),
        available,
    };
    let seat_count = i32::try_from(seats.len()).map_err(|_| insufficient.clone())?;
    if seat_count > available {
        return Err(insufficient);
    }

    Ok(Reservation {
        seat_count,
        total_amount: total_amount(price, seat_count),
    })
}

pub fn total_amount(price: f64, seat_count: i32) -> f64 {
    price * f64::from(seat_count)
}

/// Seat count as a counter delta, saturating at `i32::MAX`.
pub fn seat_delta(seat_count: usize) -> i32 {
    i32::try_from(seat_count).unwrap_or(i32::MAX)
}
