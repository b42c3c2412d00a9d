use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgExecutor, PgPool, Row};

use super::{Movie, Theater};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Screening {
    pub id: i32,
    pub movie_id: i32,
    pub theater_id: i32,
    pub screening_time: NaiveDateTime,
    pub price: f64,
    pub available_seats: i32,
}

/// Screening together with the movie and theater it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreeningDetail {
    #[serde(flatten)]
    pub screening: Screening,
    pub movie: Movie,
    pub theater: Theater,
}

#[derive(Debug, Clone)]
pub struct NewScreening {
    pub movie_id: i32,
    pub theater_id: i32,
    pub screening_time: NaiveDateTime,
    pub price: f64,
    pub available_seats: i32,
}

const SCREENING_COLUMNS: &str = "id, movie_id, theater_id, screening_time, price, available_seats";

/// Joined columns shared by every query that returns a `ScreeningDetail`.
pub(crate) const DETAIL_COLUMNS: &str = "
    s.id AS s_id, s.movie_id AS s_movie_id, s.theater_id AS s_theater_id,
    s.screening_time AS s_screening_time, s.price AS s_price,
    s.available_seats AS s_available_seats,
    m.id AS m_id, m.title AS m_title, m.description AS m_description,
    m.duration AS m_duration, m.release_date AS m_release_date, m.genre AS m_genre,
    m.rating AS m_rating, m.image_url AS m_image_url,
    t.id AS t_id, t.name AS t_name, t.total_seats AS t_total_seats";

pub(crate) const DETAIL_JOINS: &str = "
    JOIN movies m ON m.id = s.movie_id
    JOIN theaters t ON t.id = s.theater_id";

pub(crate) fn detail_from_row(row: &PgRow) -> Result<ScreeningDetail, sqlx::Error> {
    Ok(ScreeningDetail {
        screening: Screening {
            id: row.try_get("s_id")?,
            movie_id: row.try_get("s_movie_id")?,
            theater_id: row.try_get("s_theater_id")?,
            screening_time: row.try_get("s_screening_time")?,
            price: row.try_get("s_price")?,
            available_seats: row.try_get("s_available_seats")?,
        },
        movie: Movie {
            id: row.try_get("m_id")?,
            title: row.try_get("m_title")?,
            description: row.try_get("m_description")?,
            duration: row.try_get("m_duration")?,
            release_date: row.try_get("m_release_date")?,
            genre: row.try_get("m_genre")?,
            rating: row.try_get("m_rating")?,
            image_url: row.try_get("m_image_url")?,
        },
        theater: Theater {
            id: row.try_get("t_id")?,
            name: row.try_get("t_name")?,
            total_seats: row.try_get("t_total_seats")?,
        },
    })
}

impl Screening {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
    ) -> Result<Option<Screening>, sqlx::Error> {
        sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_detail(pool: &PgPool, id: i32) -> Result<Option<ScreeningDetail>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM screenings s {DETAIL_JOINS} WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.as_ref().map(detail_from_row).transpose()
    }

    pub async fn for_movie(pool: &PgPool, movie_id: i32) -> Result<Vec<Screening>, sqlx::Error> {
        sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings WHERE movie_id = $1 ORDER BY screening_time, id"
        ))
        .bind(movie_id)
        .fetch_all(pool)
        .await
    }

    pub async fn details_for_movie(
        pool: &PgPool,
        movie_id: i32,
    ) -> Result<Vec<ScreeningDetail>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM screenings s {DETAIL_JOINS}
             WHERE s.movie_id = $1 ORDER BY s.screening_time, s.id"
        ))
        .bind(movie_id)
        .fetch_all(pool)
        .await?;

        rows.iter().map(detail_from_row).collect()
    }

    pub async fn create(pool: &PgPool, screening: &NewScreening) -> Result<Screening, sqlx::Error> {
        sqlx::query_as::<_, Screening>(&format!(
            "INSERT INTO screenings (movie_id, theater_id, screening_time, price, available_seats)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {SCREENING_COLUMNS}"
        ))
        .bind(screening.movie_id)
        .bind(screening.theater_id)
        .bind(screening.screening_time)
        .bind(screening.price)
        .bind(screening.available_seats)
        .fetch_one(pool)
        .await
    }

    /// Takes `count` seats only if that many are still available.
    ///
    /// Returns the remaining counter, or `None` when the guard failed (or the
    /// screening vanished). The check and the decrement are one statement, so
    /// two concurrent bookings can never push the counter below zero.
    pub async fn take_seats<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
        count: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE screenings
             SET available_seats = available_seats - $2
             WHERE id = $1 AND available_seats >= $2
             RETURNING available_seats",
        )
        .bind(id)
        .bind(count)
        .fetch_optional(executor)
        .await
    }

    /// Gives `count` seats back. Not capped by the theater size.
    pub async fn return_seats<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
        count: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE screenings
             SET available_seats = available_seats + $2
             WHERE id = $1
             RETURNING available_seats",
        )
        .bind(id)
        .bind(count)
        .fetch_optional(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_serializes_flat_screening_with_nested_relations() {
        let when = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(19, 30, 0))
            .unwrap();
        let detail = ScreeningDetail {
            screening: Screening {
                id: 3,
                movie_id: 1,
                theater_id: 2,
                screening_time: when,
                price: 12.5,
                available_seats: 50,
            },
            movie: Movie {
                id: 1,
                title: "Inception".into(),
                description: "Dreams".into(),
                duration: 148,
                release_date: when,
                genre: "Sci-Fi".into(),
                rating: 8.8,
                image_url: None,
            },
            theater: Theater { id: 2, name: "Theater 2".into(), total_seats: 150 },
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["available_seats"], 50);
        assert_eq!(json["movie"]["title"], "Inception");
        assert_eq!(json["theater"]["total_seats"], 150);

        let back: ScreeningDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back, detail);
    }
}
