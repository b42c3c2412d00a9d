use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Theater {
    pub id: i32,
    pub name: String,
    pub total_seats: i32,
}

impl Theater {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
    ) -> Result<Option<Theater>, sqlx::Error> {
        sqlx::query_as::<_, Theater>("SELECT id, name, total_seats FROM theaters WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Theater>, sqlx::Error> {
        sqlx::query_as::<_, Theater>("SELECT id, name, total_seats FROM theaters ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &PgPool, name: &str, total_seats: i32) -> Result<Theater, sqlx::Error> {
        sqlx::query_as::<_, Theater>(
            "INSERT INTO theaters (name, total_seats) VALUES ($1, $2)
             RETURNING id, name, total_seats",
        )
        .bind(name)
        .bind(total_seats)
        .fetch_one(pool)
        .await
    }
}
