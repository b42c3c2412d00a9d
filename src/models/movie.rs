use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};

use super::Screening;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub release_date: NaiveDateTime,
    pub genre: String,
    pub rating: f64,
    pub image_url: Option<String>,
}

/// Movie with its screenings, as served by `GET /movies/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: Movie,
    pub screenings: Vec<Screening>,
}

#[derive(Debug, Clone)]
pub struct NewMovie {
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub release_date: NaiveDateTime,
    pub genre: String,
    pub rating: f64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovieSort {
    #[default]
    Title,
    Rating,
    ReleaseDate,
}

impl MovieSort {
    /// Unknown values fall back to title order.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("rating") => MovieSort::Rating,
            Some("release_date") => MovieSort::ReleaseDate,
            _ => MovieSort::Title,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            MovieSort::Title => " ORDER BY title ASC, id ASC",
            MovieSort::Rating => " ORDER BY rating DESC, id ASC",
            MovieSort::ReleaseDate => " ORDER BY release_date DESC, id ASC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub genre: Option<String>,
    pub search: Option<String>,
    pub sort: MovieSort,
    pub skip: i64,
    pub limit: i64,
}

pub const FEATURED_LIMIT: i64 = 6;

const MOVIE_COLUMNS: &str = "id, title, description, duration, release_date, genre, rating, image_url";

/// Escapes LIKE metacharacters so user input only matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &MovieFilter) {
    builder.push(" WHERE TRUE");
    if let Some(genre) = filter.genre.as_deref().filter(|g| !g.is_empty()) {
        builder.push(" AND genre = ").push_bind(genre.to_string());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND title ILIKE ").push_bind(like_pattern(search));
    }
}

impl Movie {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
    ) -> Result<Option<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn detail(pool: &PgPool, id: i32) -> Result<Option<MovieDetail>, sqlx::Error> {
        let Some(movie) = Movie::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let screenings = Screening::for_movie(pool, id).await?;
        Ok(Some(MovieDetail { movie, screenings }))
    }

    /// One page of movies plus the total number of matches.
    pub async fn search(pool: &PgPool, filter: &MovieFilter) -> Result<(Vec<Movie>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movies");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let mut page = QueryBuilder::<Postgres>::new(format!("SELECT {MOVIE_COLUMNS} FROM movies"));
        push_filters(&mut page, filter);
        page.push(filter.sort.order_by());
        page.push(" OFFSET ").push_bind(filter.skip);
        page.push(" LIMIT ").push_bind(filter.limit);
        let movies = page.build_query_as::<Movie>().fetch_all(pool).await?;

        Ok((movies, total))
    }

    pub async fn featured(pool: &PgPool) -> Result<Vec<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY rating DESC, id ASC LIMIT $1"
        ))
        .bind(FEATURED_LIMIT)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &PgPool, movie: &NewMovie) -> Result<Movie, sqlx::Error> {
        sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (title, description, duration, release_date, genre, rating, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.duration)
        .bind(movie.release_date)
        .bind(&movie.genre)
        .bind(movie.rating)
        .bind(movie.image_url.as_deref())
        .fetch_one(pool)
        .await
    }
}

/// Number of pages needed for `total` rows at `limit` per page.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}
