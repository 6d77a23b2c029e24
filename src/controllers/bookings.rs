use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::middleware::AuthUser;
use crate::models::Booking;
use crate::services::reservation::{self, SeatRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/booking", get(get_user_bookings).post(add_booking))
}

// GET /api/booking
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let bookings: Vec<Booking> = sqlx::query_as(
        "SELECT * FROM bookings
         WHERE user_id = $1
         ORDER BY created_at DESC, id",
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(bookings))
}

// POST /api/booking
#[derive(Debug, Deserialize)]
struct AddBookingRequest {
    #[serde(rename = "sessionID")]
    session_id: i64,
    #[serde(rename = "seatRow")]
    seat_row: i32,
    #[serde(rename = "seatCol")]
    seat_col: i32,
    #[serde(rename = "isVIP")]
    is_vip: bool,
}

async fn add_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(dtos): Json<Vec<AddBookingRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let requests: Vec<SeatRequest> = dtos
        .iter()
        .map(|dto| SeatRequest {
            session_id: dto.session_id,
            row: dto.seat_row,
            col: dto.seat_col,
            is_vip: dto.is_vip,
        })
        .collect();

    // проверка доступности и запись мест - одна транзакция
    let mut tx = state.db.pool.begin().await?;
    let booked = reservation::book_seats(&mut tx, user.user_id, &requests).await?;
    tx.commit().await?;

    // карты мест затронутых сеансов устарели
    let mut sessions: Vec<i64> = requests.iter().map(|r| r.session_id).collect();
    sessions.sort_unstable();
    sessions.dedup();
    for session_id in sessions {
        state.cache.invalidate_session(session_id).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("Забронировано {booked} мест.") })),
    ))
}
