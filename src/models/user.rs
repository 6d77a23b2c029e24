use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_verified: bool,
    // SHA-256/base64 от действующего refresh-токена, NULL после выхода
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl User {
    // Найти пользователя по email
    pub async fn find_by_email(
        email: &str,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&db.pool)
            .await
    }

    // Найти пользователя по id
    pub async fn find_by_id(
        id: i64,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&db.pool)
            .await
    }
}
