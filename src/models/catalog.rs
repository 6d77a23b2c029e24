use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Справочники: типы сеансов (2D/3D/IMAX), жанры, возрастные рейтинги

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AgeRate {
    pub id: i64,
    pub name: String,
    pub min_age: i32,
}
