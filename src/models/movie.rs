use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    // Длительность в минутах, строго положительная
    pub duration: i32,
    pub year: i32,
    pub rate_id: i64,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    // Окно видимости фильма: от первого до последнего сеанса
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}
