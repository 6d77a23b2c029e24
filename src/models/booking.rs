use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Проданное место: пара (seat_row, seat_col) уникальна в рамках сеанса,
// уникальность продублирована индексом в БД
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub session_id: i64,
    pub user_id: i64,
    pub seat_row: i32,
    pub seat_col: i32,
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
}

// Занятое место в карте зала для выдачи наружу и кеша
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookedSeat {
    pub row: i32,
    pub col: i32,
    #[serde(rename = "is_VIP")]
    pub is_vip: bool,
}
