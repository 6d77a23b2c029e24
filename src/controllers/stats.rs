// Статистика продаж для админки. Окна считаются в календарных сутках
// референсной таймзоны, а не в скользящих 24 часах.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/top/tickets", get(get_top_films_by_tickets))
        .route("/stats/money", get(get_money_per_period))
        .route("/stats/occupancy", get(get_halls_occupancy))
}

/* ---------- helpers ---------- */

// Начало локальных суток days_back дней назад, приведённое к UTC
fn day_start_back(now: DateTime<Utc>, tz: Tz, days_back: i64) -> DateTime<Utc> {
    let local_date = now.with_timezone(&tz).date_naive() - Duration::days(days_back);
    let midnight = local_date.and_hms_opt(0, 0, 0).unwrap();
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

fn positive_or_default(value: Option<i64>, default: i64) -> Result<i64, ApiError> {
    match value {
        None => Ok(default),
        Some(v) if v >= 1 => Ok(v),
        Some(_) => Err(ApiError::Validation("Query params error!".to_string())),
    }
}

/* ---------- TOP FILMS ---------- */

// GET /api/stats/top/tickets
#[derive(Debug, Deserialize)]
struct TopTicketsQuery {
    days: Option<i64>,
    count: Option<i64>,
}

#[derive(Debug, Serialize)]
struct FilmStats {
    film_name: String,
    sold_tickets: i64,
}

async fn get_top_films_by_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<TopTicketsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let days = positive_or_default(params.days, 7)?;
    let count = positive_or_default(params.count, 3)?;

    let now = Utc::now();
    let threshold = day_start_back(now, state.config.cinema.timezone, days - 1);

    // фильмы без единого сеанса в окне попадают в хвост с нулём билетов,
    // если их прокат закончился внутри окна
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT m.name AS film_name, COUNT(b.id) AS sold_tickets
         FROM movies m
         LEFT JOIN sessions s
           ON s.movie_id = m.id
           AND s.is_deleted = FALSE
           AND s.date BETWEEN $1 AND $2
         LEFT JOIN bookings b
           ON b.session_id = s.id
         WHERE s.id IS NOT NULL
            OR m.expires_at BETWEEN $1 AND $2
         GROUP BY m.id, m.name, m.created_at
         ORDER BY sold_tickets DESC, m.created_at DESC
         LIMIT $3",
    )
    .bind(threshold)
    .bind(now)
    .bind(count)
    .fetch_all(&state.db.pool)
    .await?;

    let films: Vec<FilmStats> = rows
        .into_iter()
        .map(|(film_name, sold_tickets)| FilmStats { film_name, sold_tickets })
        .collect();

    Ok(Json(json!({ "films": films })))
}

/* ---------- REVENUE ---------- */

// GET /api/stats/money
#[derive(Debug, Deserialize)]
struct MoneyQuery {
    days: Option<i64>,
}

async fn get_money_per_period(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<MoneyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let days = positive_or_default(params.days, 1)?;

    let now = Utc::now();
    let threshold = day_start_back(now, state.config.cinema.timezone, days - 1);

    // бронь оплачивается по цене своего сеанса: VIP или обычной
    let money: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(CASE WHEN b.is_vip THEN s.price_vip ELSE s.price END), 0)::FLOAT8
         FROM bookings b
         JOIN sessions s ON s.id = b.session_id
         WHERE s.is_deleted = FALSE AND s.date BETWEEN $1 AND $2",
    )
    .bind(threshold)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok(Json(json!({ "money": (money * 100.0).round() / 100.0 })))
}

/* ---------- HALLS OCCUPANCY ---------- */

// GET /api/stats/occupancy
#[derive(Debug, Deserialize)]
struct OccupancyQuery {
    days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct HallOccupancy {
    hall_id: i64,
    hall_name: String,
    occupancy: f64,
}

async fn get_halls_occupancy(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<OccupancyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let days = positive_or_default(params.days, 7)?;

    let now = Utc::now();
    let threshold = day_start_back(now, state.config.cinema.timezone, days - 1);

    // предложено мест = сеансы окна * размер сетки зала
    let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(
        "SELECT h.id,
                h.name,
                COALESCE(ss.session_count, 0) * h.seat_rows * h.seat_cols AS offered,
                COALESCE(bb.sold, 0) AS sold
         FROM halls h
         LEFT JOIN (
             SELECT hall_id, COUNT(*) AS session_count
             FROM sessions
             WHERE is_deleted = FALSE AND date BETWEEN $1 AND $2
             GROUP BY hall_id
         ) ss ON ss.hall_id = h.id
         LEFT JOIN (
             SELECT s.hall_id, COUNT(b.id) AS sold
             FROM bookings b
             JOIN sessions s ON s.id = b.session_id
             WHERE s.is_deleted = FALSE AND s.date BETWEEN $1 AND $2
             GROUP BY s.hall_id
         ) bb ON bb.hall_id = h.id
         ORDER BY h.name",
    )
    .bind(threshold)
    .bind(now)
    .fetch_all(&state.db.pool)
    .await?;

    let halls: Vec<HallOccupancy> = rows
        .into_iter()
        .map(|(hall_id, hall_name, offered, sold)| {
            let occupancy = if offered > 0 {
                (sold as f64 / offered as f64 * 10_000.0).round() / 100.0
            } else {
                0.0
            };
            HallOccupancy { hall_id, hall_name, occupancy }
        })
        .collect();

    Ok(Json(json!({ "halls": halls })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Kyiv;

    #[test]
    fn window_starts_at_local_midnight() {
        // 10 июля 12:00 UTC = 15:00 в Киеве; неделя назад - 4 июля 00:00
        // по Киеву, то есть 3 июля 21:00 UTC
        let now = Utc.with_ymd_and_hms(2025, 7, 10, 12, 0, 0).unwrap();
        let threshold = day_start_back(now, Kyiv, 6);
        assert_eq!(
            threshold,
            Utc.with_ymd_and_hms(2025, 7, 3, 21, 0, 0).unwrap()
        );
    }

    #[test]
    fn zero_days_back_is_today_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();
        let threshold = day_start_back(now, Kyiv, 0);
        // зимой Киев UTC+2
        assert_eq!(
            threshold,
            Utc.with_ymd_and_hms(2025, 11, 30, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn query_params_must_be_positive() {
        assert!(positive_or_default(Some(0), 7).is_err());
        assert!(positive_or_default(Some(-3), 7).is_err());
        assert_eq!(positive_or_default(None, 7).unwrap(), 7);
        assert_eq!(positive_or_default(Some(14), 7).unwrap(), 14);
    }
}
