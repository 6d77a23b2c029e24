use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::models::Hall;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/halls", get(get_halls))
}

// GET /api/halls
async fn get_halls(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let halls: Vec<Hall> =
        sqlx::query_as("SELECT id, name, seat_rows, seat_cols FROM halls ORDER BY name")
            .fetch_all(&state.db.pool)
            .await?;

    Ok(Json(halls))
}
