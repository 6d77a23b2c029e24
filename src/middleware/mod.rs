use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::ApiError;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub is_admin: bool,
}

impl AuthUser {
    // Админские ручки зовут это первой строкой
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::AdminOnly)
        }
    }
}

// Полезная нагрузка access- и refresh-токенов. jti делает токены
// уникальными даже при выпуске пары в одну и ту же секунду.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub user_id: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: i64, exp: i64) -> Self {
        Self {
            user_id,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

pub fn encode_claims<T: Serialize>(claims: &T, secret: &str) -> Result<String, ApiError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

// Любая невалидность токена (подпись, срок, мусор) - один и тот же отказ 401
pub fn decode_claims<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, ApiError> {
    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

// Структура для результата из БД
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    first_name: String,
    is_admin: bool,
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Получаем заголовок Authorization
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims: Claims = decode_claims(token, &state.config.jwt.access_secret)?;

        // Токен валиден, но пользователь мог быть удалён
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, first_name, is_admin FROM users WHERE id = $1",
        )
        .bind(claims.user_id)
        .fetch_optional(&state.db.pool)
        .await?;

        let user = row.ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            is_admin: user.is_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims_in(seconds: i64) -> Claims {
        Claims::new(42, Utc::now().timestamp() + seconds)
    }

    #[test]
    fn tokens_issued_together_are_distinct() {
        let exp = Utc::now().timestamp() + 3600;
        let a = encode_claims(&Claims::new(42, exp), "secret").unwrap();
        let b = encode_claims(&Claims::new(42, exp), "secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_round_trip() {
        let token = encode_claims(&claims_in(3600), "secret").unwrap();
        let decoded: Claims = decode_claims(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 42);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = encode_claims(&claims_in(3600), "secret").unwrap();
        let result: Result<Claims, _> = decode_claims(&token, "другой секрет");
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let token = encode_claims(&claims_in(-3600), "secret").unwrap();
        let result: Result<Claims, _> = decode_claims(&token, "secret");
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[test]
    fn admin_gate() {
        let user = AuthUser {
            user_id: 1,
            email: "a@b.c".to_string(),
            first_name: "Аня".to_string(),
            is_admin: false,
        };
        assert!(matches!(user.require_admin(), Err(ApiError::AdminOnly)));
    }
}
