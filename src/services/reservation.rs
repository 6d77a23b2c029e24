//! reservation.rs
//!
//! Продажа мест на сеанс. Пачка заявок одного пользователя либо
//! записывается целиком, либо не записывается вовсе:
//! 1.  Сеанс каждой заявки существует и не отменён; сетка зала
//!     запоминается на время вызова, чтобы не ходить в БД повторно.
//! 2.  Координаты проверяются прямоугольно: `1 <= row <= rows`,
//!     `1 <= col <= cols`.
//! 3.  Доступность проверяется и место записывается в одной транзакции
//!     под advisory-блокировкой сеанса; уникальный индекс
//!     (session_id, seat_row, seat_col) страхует от пропущенной гонки,
//!     его срабатывание трактуется как обычный отказ "место занято".

use sqlx::PgConnection;
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::errors::ApiError;
use crate::models::Hall;

// Пространство ключей advisory-блокировок сеансов
const SESSION_LOCK_NS: i64 = 0xB00C;

/// Одна заявка на место.
#[derive(Debug, Clone)]
pub struct SeatRequest {
    pub session_id: i64,
    pub row: i32,
    pub col: i32,
    pub is_vip: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct SessionGrid {
    hall_id: i64,
    hall_name: String,
    rows: i32,
    cols: i32,
}

/// Бронирует пачку мест для пользователя. Возвращает количество
/// записанных броней; при любом отказе не записывается ничего.
pub async fn book_seats(
    conn: &mut PgConnection,
    user_id: i64,
    requests: &[SeatRequest],
) -> Result<usize, ApiError> {
    if requests.is_empty() {
        return Ok(0);
    }

    // одно и то же место дважды в одной пачке - отказ ещё до БД
    if let Some(dup) = first_duplicate_seat(requests) {
        return Err(ApiError::SeatAlreadyBooked {
            row: dup.row,
            col: dup.col,
            session_id: dup.session_id,
        });
    }

    // сетки залов, по одному запросу на сеанс
    let mut grids: HashMap<i64, Hall> = HashMap::new();
    for req in requests {
        if grids.contains_key(&req.session_id) {
            continue;
        }
        let grid: Option<SessionGrid> = sqlx::query_as(
            "SELECT h.id AS hall_id, h.name AS hall_name, h.seat_rows AS rows, h.seat_cols AS cols
             FROM sessions s
             JOIN halls h ON h.id = s.hall_id
             WHERE s.id = $1 AND s.is_deleted = FALSE",
        )
        .bind(req.session_id)
        .fetch_optional(&mut *conn)
        .await?;

        let grid = grid.ok_or(ApiError::UnknownSession(req.session_id))?;
        grids.insert(
            req.session_id,
            Hall {
                id: grid.hall_id,
                name: grid.hall_name,
                rows: grid.rows,
                cols: grid.cols,
            },
        );
    }

    for req in requests {
        if !grids[&req.session_id].contains_seat(req.row, req.col) {
            return Err(ApiError::SeatOutOfRange {
                row: req.row,
                col: req.col,
            });
        }
    }

    // блокируем сеансы в отсортированном порядке, и только потом смотрим
    // занятость: конкурирующая пачка на тот же сеанс ждёт нашего коммита
    let mut session_ids: Vec<i64> = grids.keys().copied().collect();
    session_ids.sort_unstable();
    for session_id in &session_ids {
        super::acquire_xact_lock(conn, SESSION_LOCK_NS, *session_id).await?;
    }

    for req in requests {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM bookings
                 WHERE session_id = $1 AND seat_row = $2 AND seat_col = $3
             )",
        )
        .bind(req.session_id)
        .bind(req.row)
        .bind(req.col)
        .fetch_one(&mut *conn)
        .await?;

        if taken {
            return Err(ApiError::SeatAlreadyBooked {
                row: req.row,
                col: req.col,
                session_id: req.session_id,
            });
        }
    }

    for req in requests {
        let inserted = sqlx::query(
            "INSERT INTO bookings (session_id, user_id, seat_row, seat_col, is_vip)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(req.session_id)
        .bind(user_id)
        .bind(req.row)
        .bind(req.col)
        .bind(req.is_vip)
        .execute(&mut *conn)
        .await;

        if let Err(e) = inserted {
            // страховочный индекс: гонка, не пойманная блокировкой,
            // остаётся доменным отказом, а не 500
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return Err(ApiError::SeatAlreadyBooked {
                        row: req.row,
                        col: req.col,
                        session_id: req.session_id,
                    });
                }
            }
            return Err(e.into());
        }
    }

    info!(
        "booked {} seats for user {} across {} sessions",
        requests.len(),
        user_id,
        session_ids.len()
    );
    Ok(requests.len())
}

// Первый повтор координаты (session, row, col) внутри пачки
fn first_duplicate_seat(requests: &[SeatRequest]) -> Option<&SeatRequest> {
    let mut seen = HashSet::new();
    requests
        .iter()
        .find(|r| !seen.insert((r.session_id, r.row, r.col)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(session_id: i64, row: i32, col: i32) -> SeatRequest {
        SeatRequest { session_id, row, col, is_vip: false }
    }

    #[test]
    fn detects_duplicate_seat_within_batch() {
        let requests = vec![req(1, 5, 6), req(1, 5, 7), req(1, 5, 6)];
        let dup = first_duplicate_seat(&requests).unwrap();
        assert_eq!((dup.row, dup.col), (5, 6));
    }

    #[test]
    fn same_seat_on_different_sessions_is_not_a_duplicate() {
        let requests = vec![req(1, 5, 6), req(2, 5, 6)];
        assert!(first_duplicate_seat(&requests).is_none());
    }

    #[test]
    fn vip_flag_does_not_affect_seat_identity() {
        let requests = vec![
            SeatRequest { session_id: 1, row: 3, col: 3, is_vip: false },
            SeatRequest { session_id: 1, row: 3, col: 3, is_vip: true },
        ];
        assert!(first_duplicate_seat(&requests).is_some());
    }
}
