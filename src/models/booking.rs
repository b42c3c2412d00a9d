use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgExecutor, PgPool, Row};

use super::screening::{detail_from_row, ScreeningDetail, DETAIL_COLUMNS, DETAIL_JOINS};
use super::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Pending,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i32,
    pub user_id: Option<i32>,
    pub screening_id: i32,
    pub seats: Vec<i32>,
    pub total_amount: f64,
    pub booking_time: NaiveDateTime,
    pub status: String,
}

/// Booking as returned by the API: its screening (with movie and theater)
/// is embedded, and admin listings also carry the owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub screening: ScreeningDetail,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone)]
pub struct NewBooking<'a> {
    pub user_id: i32,
    pub screening_id: i32,
    pub seats: &'a [i32],
    pub total_amount: f64,
    pub status: BookingStatus,
}

const BOOKING_COLUMNS: &str = "id, user_id, screening_id, seats, total_amount, booking_time, status";

const DETAIL_SELECT: &str = "
    b.id AS b_id, b.user_id AS b_user_id, b.screening_id AS b_screening_id,
    b.seats AS b_seats, b.total_amount AS b_total_amount,
    b.booking_time AS b_booking_time, b.status AS b_status,
    u.id AS u_id, u.username AS u_username, u.email AS u_email,
    u.is_admin AS u_is_admin, u.is_active AS u_is_active";

fn detail_query(filter: &str) -> String {
    format!(
        "SELECT {DETAIL_SELECT}, {DETAIL_COLUMNS}
         FROM bookings b
         JOIN screenings s ON s.id = b.screening_id
         {DETAIL_JOINS}
         LEFT JOIN users u ON u.id = b.user_id
         {filter}
         ORDER BY b.booking_time DESC, b.id DESC"
    )
}

fn booking_detail_from_row(row: &PgRow, with_user: bool) -> Result<BookingDetail, sqlx::Error> {
    let booking = Booking {
        id: row.try_get("b_id")?,
        user_id: row.try_get("b_user_id")?,
        screening_id: row.try_get("b_screening_id")?,
        seats: row.try_get("b_seats")?,
        total_amount: row.try_get("b_total_amount")?,
        booking_time: row.try_get("b_booking_time")?,
        status: row.try_get("b_status")?,
    };

    let user = match row.try_get::<Option<i32>, _>("u_id")? {
        Some(id) if with_user => Some(UserSummary {
            id,
            username: row.try_get("u_username")?,
            email: row.try_get("u_email")?,
            is_admin: row.try_get("u_is_admin")?,
            is_active: row.try_get("u_is_active")?,
        }),
        _ => None,
    };

    Ok(BookingDetail {
        booking,
        screening: detail_from_row(row)?,
        user,
    })
}

impl Booking {
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        booking: &NewBooking<'_>,
    ) -> Result<Booking, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (user_id, screening_id, seats, total_amount, booking_time, status)
             VALUES ($1, $2, $3, $4, NOW() AT TIME ZONE 'utc', $5)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking.user_id)
        .bind(booking.screening_id)
        .bind(booking.seats)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn detail(pool: &PgPool, id: i32) -> Result<Option<BookingDetail>, sqlx::Error> {
        let row = sqlx::query(&detail_query("WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        row.map(|r| booking_detail_from_row(&r, false)).transpose()
    }

    pub async fn details_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let rows = sqlx::query(&detail_query("WHERE b.user_id = $1"))
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        rows.iter().map(|r| booking_detail_from_row(r, false)).collect()
    }

    /// Every booking, newest first, with its owner.
    pub async fn all_details(pool: &PgPool) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let rows = sqlx::query(&detail_query("")).fetch_all(pool).await?;
        rows.iter().map(|r| booking_detail_from_row(r, true)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_serde_names() {
        for status in [BookingStatus::Confirmed, BookingStatus::Cancelled, BookingStatus::Pending] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
    }

    #[test]
    fn detail_query_orders_newest_first() {
        let sql = detail_query("WHERE b.user_id = $1");
        assert!(sql.contains("LEFT JOIN users u ON u.id = b.user_id"));
        assert!(sql.contains("WHERE b.user_id = $1"));
        assert!(sql.trim_end().ends_with("ORDER BY b.booking_time DESC, b.id DESC"));
    }
}
