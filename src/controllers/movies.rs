use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::movie::{total_pages, Movie, MovieDetail, MovieFilter, MovieSort, NewMovie};
use crate::models::{Screening, ScreeningDetail};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies).post(add_movie))
        .route("/movies/add", post(add_movie))
        .route("/movies/featured", get(featured_movies))
        .route("/movies/{movie_id}", get(read_movie))
        .route("/movies/{movie_id}/screenings", get(movie_screenings))
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub genre: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl MovieListQuery {
    fn into_filter(self) -> MovieFilter {
        MovieFilter {
            sort: MovieSort::parse(self.sort.as_deref()),
            genre: self.genre,
            search: self.search,
            skip: self.skip.unwrap_or(0).max(0),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovieListResponse {
    pub movies: Vec<Movie>,
    pub total: i64,
    pub total_pages: i64,
}

/// Accepts either a full timestamp or a bare `YYYY-MM-DD` date (midnight).
pub(crate) fn date_or_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(dt) = raw.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    raw.parse::<NaiveDate>()
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date or datetime: {raw}")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct MovieCreate {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(range(min = 1))]
    pub duration: i32,
    #[serde(deserialize_with = "date_or_datetime")]
    pub release_date: NaiveDateTime,
    #[validate(length(min = 1, max = 100))]
    pub genre: String,
    #[validate(range(min = 0.0, max = 10.0))]
    pub rating: f64,
    #[validate(length(max = 255))]
    pub image_url: Option<String>,
}

impl From<MovieCreate> for NewMovie {
    fn from(m: MovieCreate) -> Self {
        NewMovie {
            title: m.title,
            description: m.description,
            duration: m.duration,
            release_date: m.release_date,
            genre: m.genre,
            rating: m.rating,
            image_url: m.image_url.filter(|url| !url.is_empty()),
        }
    }
}

// GET /movies
async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MovieListQuery>,
) -> AppResult<Json<MovieListResponse>> {
    let filter = query.into_filter();
    let (movies, total) = Movie::search(&state.db.pool, &filter).await?;
    Ok(Json(MovieListResponse {
        movies,
        total,
        total_pages: total_pages(total, filter.limit),
    }))
}

// GET /movies/featured
async fn featured_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.cache.featured_movies(&state.db.pool).await?))
}

// GET /movies/{movie_id}
async fn read_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
) -> AppResult<Json<MovieDetail>> {
    state
        .cache
        .movie_detail(&state.db.pool, movie_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Movie not found"))
}

// GET /movies/{movie_id}/screenings
async fn movie_screenings(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
) -> AppResult<Json<Vec<ScreeningDetail>>> {
    Ok(Json(Screening::details_for_movie(&state.db.pool, movie_id).await?))
}

// POST /movies, POST /movies/add
async fn add_movie(
    State(state): State<Arc<AppState>>,
    current: AuthUser,
    Json(req): Json<MovieCreate>,
) -> AppResult<Json<Movie>> {
    let admin = current.require_admin("Not authorized to add movies")?;
    req.validate()?;

    let movie = Movie::create(&state.db.pool, &req.into()).await?;
    state.cache.movie_added().await;

    info!(movie_id = movie.id, title = %movie.title, by = %admin.username, "movie added");
    Ok(Json(movie))
}
