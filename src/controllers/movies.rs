use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::errors::ApiError;
use crate::middleware::AuthUser;
use crate::models::Movie;
use crate::services::scheduling::{MovieSessionProposal, NewMovie};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(get_active_movies))
        .route("/movie", get(find_movie).post(add_movie))
        .route("/movie/{movie_id}", get(get_movie_by_id).put(update_movie))
}

/* ---------- MOVIE LIST ---------- */

// GET /api/movies
#[derive(Debug, Deserialize)]
struct MoviesQuery {
    qtty: Option<i64>,
}

#[derive(Debug, Serialize)]
struct NearestSessionResponse {
    id: i64,
    date: String,
    session_type_id: i64,
}

#[derive(Debug, Serialize)]
struct MovieListItemResponse {
    id: i64,
    name: String,
    description: Option<String>,
    duration: i32,
    year: i32,
    rating: Option<f64>,
    poster_url: Option<String>,
    genres: Vec<String>,
    nearest_session: Option<NearestSessionResponse>,
}

// Активные фильмы и премьеры ближайших двух недель,
// каждый с ближайшим предстоящим сеансом
async fn get_active_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MoviesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if matches!(params.qtty, Some(q) if q <= 0) {
        return Err(ApiError::BadQueryParam);
    }

    let movies: Vec<Movie> = sqlx::query_as(
        "SELECT * FROM movies
         WHERE (created_at <= NOW() AND expires_at >= NOW())
            OR (created_at BETWEEN NOW() AND NOW() + INTERVAL '14 days')
         ORDER BY created_at ASC
         LIMIT $1",
    )
    .bind(params.qtty)
    .fetch_all(&state.db.pool)
    .await?;

    let clock = state.scheduling.clock();
    let mut payload = Vec::with_capacity(movies.len());
    for movie in movies {
        let genres: Vec<String> = sqlx::query_scalar(
            "SELECT g.name FROM genres g
             JOIN movie_genres mg ON mg.genre_id = g.id
             WHERE mg.movie_id = $1
             ORDER BY g.name",
        )
        .bind(movie.id)
        .fetch_all(&state.db.pool)
        .await?;

        let nearest: Option<(i64, DateTime<Utc>, i64)> = sqlx::query_as(
            "SELECT id, date, session_type_id FROM sessions
             WHERE movie_id = $1 AND is_deleted = FALSE AND date >= NOW()
             ORDER BY date
             LIMIT 1",
        )
        .bind(movie.id)
        .fetch_optional(&state.db.pool)
        .await?;

        payload.push(MovieListItemResponse {
            id: movie.id,
            name: movie.name,
            description: movie.description,
            duration: movie.duration,
            year: movie.year,
            rating: movie.rating,
            poster_url: movie.poster_url,
            genres,
            nearest_session: nearest.map(|(id, date, session_type_id)| NearestSessionResponse {
                id,
                date: clock.format(date),
                session_type_id,
            }),
        });
    }

    Ok(Json(payload))
}

/* ---------- TMDB LOOKUP ---------- */

// GET /api/movie?name=...&year=...
#[derive(Debug, Deserialize)]
struct FindMovieQuery {
    name: String,
    year: i32,
}

async fn find_movie(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FindMovieQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let movie = state
        .tmdb
        .search_movie(&params.name, params.year)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .ok_or(ApiError::MovieNotFound)?;

    Ok(Json(movie))
}

/* ---------- MOVIE CARD ---------- */

// GET /api/movie/{movie_id}
#[derive(Debug, Serialize)]
struct MovieCardResponse {
    id: i64,
    name: String,
    description: Option<String>,
    duration: i32,
    year: i32,
    age_rate: String,
    rating: Option<f64>,
    poster_url: Option<String>,
    trailer_url: Option<String>,
    genres: Vec<String>,
    directors: Vec<String>,
    actors: Vec<String>,
    studios: Vec<String>,
}

async fn get_movie_by_id(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if movie_id <= 0 {
        return Err(ApiError::Validation("Некорректный ID фильма".to_string()));
    }

    let movie: Option<Movie> = sqlx::query_as("SELECT * FROM movies WHERE id = $1")
        .bind(movie_id)
        .fetch_optional(&state.db.pool)
        .await?;
    let movie = movie.ok_or(ApiError::UnknownMovie(movie_id))?;

    let age_rate: String = sqlx::query_scalar("SELECT name FROM age_rates WHERE id = $1")
        .bind(movie.rate_id)
        .fetch_one(&state.db.pool)
        .await?;

    let genres: Vec<String> = sqlx::query_scalar(
        "SELECT g.name FROM genres g
         JOIN movie_genres mg ON mg.genre_id = g.id
         WHERE mg.movie_id = $1
         ORDER BY g.name",
    )
    .bind(movie_id)
    .fetch_all(&state.db.pool)
    .await?;

    let directors: Vec<String> = sqlx::query_scalar(
        "SELECT d.first_name || ' ' || d.last_name FROM directors d
         JOIN movie_directors md ON md.director_id = d.id
         WHERE md.movie_id = $1
         ORDER BY d.last_name",
    )
    .bind(movie_id)
    .fetch_all(&state.db.pool)
    .await?;

    let actors: Vec<String> = sqlx::query_scalar(
        "SELECT a.first_name || ' ' || a.last_name FROM actors a
         JOIN movie_actors ma ON ma.actor_id = a.id
         WHERE ma.movie_id = $1
         ORDER BY a.last_name",
    )
    .bind(movie_id)
    .fetch_all(&state.db.pool)
    .await?;

    let studios: Vec<String> = sqlx::query_scalar(
        "SELECT s.name FROM studios s
         JOIN movie_studios ms ON ms.studio_id = s.id
         WHERE ms.movie_id = $1
         ORDER BY s.name",
    )
    .bind(movie_id)
    .fetch_all(&state.db.pool)
    .await?;

    // свежая оценка TMDB, при недоступности API остаётся сохранённая
    let rating = match state.tmdb.movie_rating(&movie.name, movie.year).await {
        Ok(Some(rating)) => Some(rating),
        Ok(None) => movie.rating,
        Err(e) => {
            warn!("TMDB rating lookup failed for movie {}: {}", movie_id, e);
            movie.rating
        }
    };

    Ok(Json(MovieCardResponse {
        id: movie.id,
        name: movie.name,
        description: movie.description,
        duration: movie.duration,
        year: movie.year,
        age_rate,
        rating,
        poster_url: movie.poster_url,
        trailer_url: movie.trailer_url,
        genres,
        directors,
        actors,
        studios,
    }))
}

/* ---------- ADD MOVIE WITH SESSIONS ---------- */

// POST /api/movie
#[derive(Debug, Deserialize)]
struct NamedDto {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PersonDto {
    first_name: String,
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct MovieSessionDto {
    date: String,
    price: f64,
    #[serde(rename = "priceVIP")]
    price_vip: f64,
    #[serde(rename = "hallID")]
    hall_id: i64,
    #[serde(rename = "sessionTypeID")]
    session_type_id: i64,
}

#[derive(Debug, Deserialize)]
struct AddMovieRequest {
    name: String,
    description: String,
    duration: i32,
    year: i32,
    age_rate_id: i64,
    rating: f64,
    poster_url: String,
    trailer_url: String,
    genres: Vec<NamedDto>,
    directors: Vec<PersonDto>,
    actors: Vec<PersonDto>,
    studios: Vec<NamedDto>,
    sessions: Vec<MovieSessionDto>,
}

async fn add_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(dto): Json<AddMovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    if dto.duration < 1 {
        return Err(ApiError::Validation(
            "duration must not be less than 1".to_string(),
        ));
    }

    let clock = state.scheduling.clock();
    let mut proposals = Vec::with_capacity(dto.sessions.len());
    for session in &dto.sessions {
        if session.price < 0.01 || session.price_vip < 0.01 {
            return Err(ApiError::Validation(
                "price must not be less than 0.01".to_string(),
            ));
        }
        proposals.push(MovieSessionProposal {
            start: clock.normalize(&session.date)?,
            price: session.price,
            price_vip: session.price_vip,
            hall_id: session.hall_id,
            session_type_id: session.session_type_id,
        });
    }

    let movie = NewMovie {
        name: dto.name.trim().to_string(),
        description: dto.description.trim().to_string(),
        duration: dto.duration,
        year: dto.year,
        age_rate_id: dto.age_rate_id,
        rating: dto.rating,
        poster_url: dto.poster_url,
        trailer_url: dto.trailer_url,
        genres: dto.genres.into_iter().map(|g| g.name).collect(),
        directors: dto
            .directors
            .into_iter()
            .map(|p| (p.first_name, p.last_name))
            .collect(),
        actors: dto
            .actors
            .into_iter()
            .map(|p| (p.first_name, p.last_name))
            .collect(),
        studios: dto.studios.into_iter().map(|s| s.name).collect(),
    };

    // фильм, связи и расписание пишутся одной атомарной единицей
    let mut tx = state.db.pool.begin().await?;
    let movie_id = state
        .scheduling
        .create_movie_with_sessions(&mut tx, &movie, &proposals)
        .await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": 201,
            "message": "Фильм добавлен успешно!",
            "data": { "movie_id": movie_id },
        })),
    ))
}

/* ---------- UPDATE MOVIE ---------- */

// PUT /api/movie/{movie_id}
#[derive(Debug, Deserialize)]
struct UpdateMovieRequest {
    name: Option<String>,
    description: Option<String>,
    age_rate_id: Option<i64>,
    expiration_date: Option<String>,
}

async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
    user: AuthUser,
    Json(dto): Json<UpdateMovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    if movie_id <= 0 {
        return Err(ApiError::Validation("Некорректный ID фильма".to_string()));
    }

    if dto.name.is_none()
        && dto.description.is_none()
        && dto.age_rate_id.is_none()
        && dto.expiration_date.is_none()
    {
        return Err(ApiError::Validation(
            "Необходимо указать хотя бы одно поле для обновления".to_string(),
        ));
    }

    // голая дата означает конец суток
    let expires_at = dto
        .expiration_date
        .as_deref()
        .map(|raw| state.scheduling.clock().normalize_range_bound(raw, true))
        .transpose()?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM movies WHERE id = $1)")
        .bind(movie_id)
        .fetch_one(&state.db.pool)
        .await?;
    if !exists {
        return Err(ApiError::UnknownMovie(movie_id));
    }

    if let Some(rate_id) = dto.age_rate_id {
        let rate_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM age_rates WHERE id = $1)")
                .bind(rate_id)
                .fetch_one(&state.db.pool)
                .await?;
        if !rate_exists {
            return Err(ApiError::UnknownAgeRate(rate_id));
        }
    }

    let mut sets: Vec<String> = Vec::new();
    let mut idx = 1;
    if dto.name.is_some() {
        sets.push(format!("name = ${idx}"));
        idx += 1;
    }
    if dto.description.is_some() {
        sets.push(format!("description = ${idx}"));
        idx += 1;
    }
    if dto.age_rate_id.is_some() {
        sets.push(format!("rate_id = ${idx}"));
        idx += 1;
    }
    if expires_at.is_some() {
        sets.push(format!("expires_at = ${idx}"));
        idx += 1;
    }

    let q = format!("UPDATE movies SET {} WHERE id = ${idx}", sets.join(", "));

    let mut query = sqlx::query(&q);
    if let Some(name) = &dto.name {
        query = query.bind(name.trim().to_string());
    }
    if let Some(description) = &dto.description {
        query = query.bind(description.trim().to_string());
    }
    if let Some(rate_id) = dto.age_rate_id {
        query = query.bind(rate_id);
    }
    if let Some(expires_at) = expires_at {
        query = query.bind(expires_at);
    }
    query.bind(movie_id).execute(&state.db.pool).await?;

    Ok(Json(json!({
        "status": 200,
        "message": "Инфо о фильме обновлено успешно!",
        "data": { "movie_id": movie_id },
    })))
}
