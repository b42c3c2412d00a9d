use sqlx::PgPool;

use crate::cache::{keys, CacheService};
use crate::models::movie::{Movie, MovieDetail};

impl CacheService {
    pub async fn featured_movies(&self, pool: &PgPool) -> Result<Vec<Movie>, sqlx::Error> {
        if let Some(movies) = self.get_json(keys::FEATURED_MOVIES).await {
            return Ok(movies);
        }
        let movies = Movie::featured(pool).await?;
        self.set_json(keys::FEATURED_MOVIES, &movies).await;
        Ok(movies)
    }

    pub async fn movie_detail(&self, pool: &PgPool, id: i32) -> Result<Option<MovieDetail>, sqlx::Error> {
        let key = keys::movie(id);
        if let Some(detail) = self.get_json(&key).await {
            return Ok(Some(detail));
        }
        let detail = Movie::detail(pool, id).await?;
        if let Some(detail) = &detail {
            self.set_json(&key, detail).await;
        }
        Ok(detail)
    }

    pub async fn movie_added(&self) {
        self.invalidate(&[keys::FEATURED_MOVIES.to_string()]).await;
    }

    /// A movie's detail embeds its screenings and their seat counters.
    pub async fn movie_screenings_changed(&self, movie_id: i32) {
        self.invalidate(&[keys::movie(movie_id)]).await;
    }
}
