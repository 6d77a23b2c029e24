use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::models::{AgeRate, Genre};
use crate::AppState;

// Справочники: жанры и возрастные рейтинги

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/genres", get(get_genres))
        .route("/age-rates", get(get_age_rates))
}

// GET /api/genres
async fn get_genres(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let genres: Vec<Genre> = sqlx::query_as("SELECT id, name FROM genres ORDER BY id")
        .fetch_all(&state.db.pool)
        .await?;

    Ok(Json(genres))
}

// GET /api/age-rates
async fn get_age_rates(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let rates: Vec<AgeRate> =
        sqlx::query_as("SELECT id, name, min_age FROM age_rates ORDER BY id")
            .fetch_all(&state.db.pool)
            .await?;

    Ok(Json(rates))
}
