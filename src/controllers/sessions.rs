use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::middleware::AuthUser;
use crate::models::{Session, SessionStatus, SessionType};
use crate::services::clock::Clock;
use crate::services::scheduling::{SessionProposal, SessionUpdate};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session/types", get(get_session_types))
        .route("/session", post(add_sessions))
        .route("/session/by-movie/{movie_id}", get(get_sessions_by_movie))
        .route(
            "/session/{session_id}",
            get(get_session_by_id).put(update_session),
        )
        .route("/sessions", put(update_sessions))
}

/* ---------- helpers ---------- */

// Цены валидируются до любых обращений к хранилищу
fn check_price(value: f64, field: &str) -> Result<(), ApiError> {
    if value < 0.01 {
        return Err(ApiError::Validation(format!(
            "{field} must not be less than 0.01"
        )));
    }
    Ok(())
}

/* ---------- SESSION TYPES ---------- */

// GET /api/session/types
async fn get_session_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let types: Vec<SessionType> =
        sqlx::query_as("SELECT id, name FROM session_types ORDER BY id")
            .fetch_all(&state.db.pool)
            .await?;

    Ok(Json(types))
}

/* ---------- ADD SESSIONS ---------- */

// POST /api/session
#[derive(Debug, Deserialize)]
struct AddSessionRequest {
    #[serde(rename = "movieID")]
    movie_id: i64,
    date: String,
    price: f64,
    #[serde(rename = "priceVIP")]
    price_vip: f64,
    #[serde(rename = "hallID")]
    hall_id: i64,
    #[serde(rename = "sessionTypeID")]
    session_type_id: i64,
}

async fn add_sessions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(dtos): Json<Vec<AddSessionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let clock = state.scheduling.clock();
    let mut proposals = Vec::with_capacity(dtos.len());
    for dto in &dtos {
        check_price(dto.price, "price")?;
        check_price(dto.price_vip, "price_VIP")?;

        proposals.push(SessionProposal {
            movie_id: dto.movie_id,
            start: clock.normalize(&dto.date)?,
            price: dto.price,
            price_vip: dto.price_vip,
            hall_id: dto.hall_id,
            session_type_id: dto.session_type_id,
        });
    }

    // валидация и запись всей пачки - одна транзакция
    let mut tx = state.db.pool.begin().await?;
    let added = state.scheduling.add_sessions(&mut tx, &proposals).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        format!("Успешно добавлено {added} сеансов"),
    ))
}

/* ---------- SESSIONS BY MOVIE ---------- */

// GET /api/session/by-movie/{movie_id}
#[derive(Debug, Deserialize)]
struct SessionsByMovieQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct MovieSessionResponse {
    id: i64,
    date: String,
    session_type_id: i64,
}

async fn get_sessions_by_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
    Query(params): Query<SessionsByMovieQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if movie_id <= 0 {
        return Err(ApiError::Validation("Некорректный id фильма!".to_string()));
    }

    let clock = state.scheduling.clock();

    // без явной нижней границы показываем только будущие сеансы
    let from = match &params.start_date {
        Some(raw) => clock.normalize_range_bound(raw, false)?,
        None => Utc::now(),
    };
    let to = params
        .end_date
        .as_deref()
        .map(|raw| clock.normalize_range_bound(raw, true))
        .transpose()?;

    let sessions: Vec<Session> = match to {
        Some(to) => {
            sqlx::query_as(
                "SELECT * FROM sessions
                 WHERE movie_id = $1 AND is_deleted = FALSE AND date >= $2 AND date <= $3
                 ORDER BY date",
            )
            .bind(movie_id)
            .bind(from)
            .bind(to)
            .fetch_all(&state.db.pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM sessions
                 WHERE movie_id = $1 AND is_deleted = FALSE AND date >= $2
                 ORDER BY date",
            )
            .bind(movie_id)
            .bind(from)
            .fetch_all(&state.db.pool)
            .await?
        }
    };

    let payload: Vec<MovieSessionResponse> = sessions
        .into_iter()
        .map(|session| MovieSessionResponse {
            id: session.id,
            date: clock.format(session.date),
            session_type_id: session.session_type_id,
        })
        .collect();

    Ok(Json(payload))
}

/* ---------- SESSION INFO ---------- */

// GET /api/session/{session_id}
#[derive(Debug, Serialize)]
struct SeatInfo {
    #[serde(rename = "is_VIP")]
    is_vip: bool,
    is_booked: bool,
    row: i32,
    col: i32,
}

#[derive(Debug, Serialize)]
struct SessionInfoResponse {
    hall_name: String,
    date_time: String,
    price: f64,
    #[serde(rename = "price_VIP")]
    price_vip: f64,
    session_type_id: i64,
    seats: Vec<SeatInfo>,
}

async fn get_session_by_id(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if session_id <= 0 {
        return Err(ApiError::Validation("Некорректный id сеанса!".to_string()));
    }

    let row: Option<(String, DateTime<Utc>, f64, f64, i64)> = sqlx::query_as(
        "SELECT h.name, s.date, s.price, s.price_vip, s.session_type_id
         FROM sessions s
         JOIN halls h ON h.id = s.hall_id
         WHERE s.id = $1 AND s.is_deleted = FALSE",
    )
    .bind(session_id)
    .fetch_optional(&state.db.pool)
    .await?;

    let (hall_name, date, price, price_vip, session_type_id) =
        row.ok_or(ApiError::UnknownSession(session_id))?;

    // карта занятых мест идёт через кеш
    let seats = state
        .cache
        .get_booked_seats(session_id)
        .await?
        .into_iter()
        .map(|seat| SeatInfo {
            is_vip: seat.is_vip,
            is_booked: true,
            row: seat.row,
            col: seat.col,
        })
        .collect();

    Ok(Json(SessionInfoResponse {
        hall_name,
        date_time: state.scheduling.clock().format(date),
        price,
        price_vip,
        session_type_id,
        seats,
    }))
}

/* ---------- UPDATE SESSIONS ---------- */

#[derive(Debug, Deserialize)]
struct UpdateSessionRequest {
    date: Option<String>,
    price: Option<f64>,
    #[serde(rename = "price_VIP")]
    price_vip: Option<f64>,
    hall_id: Option<i64>,
    session_type_id: Option<i64>,
    is_deleted: Option<bool>,
}

impl UpdateSessionRequest {
    fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.price.is_none()
            && self.price_vip.is_none()
            && self.hall_id.is_none()
            && self.session_type_id.is_none()
            && self.is_deleted.is_none()
    }

    fn into_update(self, clock: &Clock) -> Result<SessionUpdate, ApiError> {
        if let Some(price) = self.price {
            check_price(price, "price")?;
        }
        if let Some(price_vip) = self.price_vip {
            check_price(price_vip, "price_VIP")?;
        }

        Ok(SessionUpdate {
            date: self.date.as_deref().map(|raw| clock.normalize(raw)).transpose()?,
            price: self.price,
            price_vip: self.price_vip,
            hall_id: self.hall_id,
            session_type_id: self.session_type_id,
            status: self.is_deleted.map(|deleted| {
                if deleted {
                    SessionStatus::Cancelled
                } else {
                    SessionStatus::Active
                }
            }),
        })
    }
}

// PUT /api/session/{session_id}
async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
    user: AuthUser,
    Json(dto): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    if session_id <= 0 {
        return Err(ApiError::Validation("Некорректный id сеанса!".to_string()));
    }

    let upd = dto.into_update(&state.scheduling.clock())?;

    let mut tx = state.db.pool.begin().await?;
    state.scheduling.update_session(&mut tx, session_id, &upd).await?;
    tx.commit().await?;

    state.cache.invalidate_session(session_id).await;

    Ok(Json(json!({
        "status": 200,
        "message": "Инфо о сеансе обновлено успешно!",
    })))
}

// PUT /api/sessions
#[derive(Debug, Deserialize)]
struct UpdateSessionsRequest {
    session_id: i64,
    #[serde(flatten)]
    fields: UpdateSessionRequest,
}

async fn update_sessions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(dtos): Json<Vec<UpdateSessionsRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let clock = state.scheduling.clock();
    let mut items = Vec::with_capacity(dtos.len());
    for (i, dto) in dtos.into_iter().enumerate() {
        if dto.fields.is_empty() {
            return Err(ApiError::EmptyUpdateAt(i));
        }
        if dto.session_id <= 0 {
            return Err(ApiError::Validation("Некорректный id сеанса!".to_string()));
        }
        items.push((dto.session_id, dto.fields.into_update(&clock)?));
    }

    // пачка обновлений атомарна: любой отказ откатывает всё
    let mut tx = state.db.pool.begin().await?;
    state.scheduling.update_sessions(&mut tx, &items).await?;
    tx.commit().await?;

    for (session_id, _) in &items {
        state.cache.invalidate_session(*session_id).await;
    }

    Ok(Json(json!({
        "status": 200,
        "message": "Информация о сеансах обновлена успешно!",
    })))
}
