// Регистрация, вход, ротация refresh-токенов и подтверждение email.
// Пароли хранятся bcrypt-хешем; refresh-токен лежит в БД только дайджестом
// и заменяется при каждом обновлении пары.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::errors::ApiError;
use crate::middleware::{decode_claims, encode_claims, AuthUser, Claims};
use crate::models::User;
use crate::services::crypto;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/refresh", post(refresh))
        .route("/auth/verify-email", get(verify_email))
}

/* ---------- helpers ---------- */

#[derive(Debug, Serialize)]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

// Полезная нагрузка письма-подтверждения
#[derive(Debug, Serialize, Deserialize)]
struct EmailClaims {
    email: String,
    exp: i64,
}

// Новая пара токенов; в БД остаётся только дайджест refresh-токена
async fn issue_token_pair(
    state: &Arc<AppState>,
    user_id: i64,
) -> Result<TokenPairResponse, ApiError> {
    let jwt = &state.config.jwt;
    let now = Utc::now();

    let access_token = encode_claims(
        &Claims::new(
            user_id,
            (now + Duration::hours(jwt.access_expires_in_hours)).timestamp(),
        ),
        &jwt.access_secret,
    )?;

    let refresh_token = encode_claims(
        &Claims::new(
            user_id,
            (now + Duration::days(jwt.refresh_expires_in_days)).timestamp(),
        ),
        &jwt.refresh_secret,
    )?;

    sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
        .bind(user_id)
        .bind(crypto::sha256_base64(&refresh_token))
        .execute(&state.db.pool)
        .await?;

    Ok(TokenPairResponse { access_token, refresh_token })
}

// Письмо-подтверждение уходит в фоне: регистрацию сбой почты не валит
fn send_verification_letter(state: &Arc<AppState>, email: String) -> Result<(), ApiError> {
    let token = encode_claims(
        &EmailClaims {
            email: email.clone(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        },
        &state.config.jwt.email_secret,
    )?;

    let link = format!(
        "{}/api/auth/verify-email?token={}",
        state.config.app.server_url, token
    );
    let html = format!(
        "<p>Перейдите по ссылке, чтобы подтвердить свой email: <a href=\"{link}\">{link}</a></p>"
    );

    let client = state.email.clone();
    tokio::spawn(async move {
        client.send(&email, "Подтвердите свой email!", &html).await;
    });
    Ok(())
}

/* ---------- SIGN UP / SIGN IN ---------- */

// POST /api/auth/sign-up
#[derive(Debug, Deserialize, Validate)]
struct SignUpRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    first_name: String,
    #[validate(length(min = 1))]
    last_name: String,
    #[validate(length(min = 8))]
    password: String,
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if User::find_by_email(&dto.email, &state.db).await?.is_some() {
        return Err(ApiError::EmailTaken(dto.email));
    }

    let password_hash = crypto::hash_password(&dto.password)?;

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, first_name, last_name)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(&dto.email)
    .bind(&password_hash)
    .bind(&dto.first_name)
    .bind(&dto.last_name)
    .fetch_one(&state.db.pool)
    .await?;

    send_verification_letter(&state, dto.email)?;

    let pair = issue_token_pair(&state, user_id).await?;
    Ok((StatusCode::CREATED, Json(pair)))
}

// POST /api/auth/sign-in
#[derive(Debug, Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_email(&dto.email, &state.db).await?;

    // один и тот же отказ для незнакомого email и неверного пароля
    let user = user.ok_or(ApiError::InvalidCredentials)?;
    if !crypto::verify_password(&dto.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let pair = issue_token_pair(&state, user.id).await?;
    Ok(Json(pair))
}

/* ---------- SIGN OUT / REFRESH ---------- */

// POST /api/auth/sign-out
async fn sign_out(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = $1")
        .bind(user.user_id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(json!({ "message": "Пользователь успешно вышел из аккаунта." })))
}

// POST /api/auth/refresh
#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims: Claims = decode_claims(&dto.refresh_token, &state.config.jwt.refresh_secret)?;

    let user = User::find_by_id(claims.user_id, &state.db)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // токен подписан нами, но мог быть отозван или заменён более новым
    let digest = crypto::sha256_base64(&dto.refresh_token);
    if user.refresh_token.as_deref() != Some(digest.as_str()) {
        return Err(ApiError::Unauthorized);
    }

    let pair = issue_token_pair(&state, user.id).await?;
    Ok(Json(pair))
}

/* ---------- EMAIL VERIFICATION ---------- */

// GET /api/auth/verify-email?token=...
#[derive(Debug, Deserialize)]
struct VerifyEmailQuery {
    token: String,
}

async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyEmailQuery>,
) -> impl IntoResponse {
    let frontend = state.config.app.frontend_url.clone();

    // битый или просроченный токен - тот же redirect, без деталей наружу
    let Ok(claims) = decode_claims::<EmailClaims>(&params.token, &state.config.jwt.email_secret)
    else {
        return Redirect::to(&frontend);
    };

    let updated = sqlx::query("UPDATE users SET is_verified = TRUE WHERE email = $1")
        .bind(&claims.email)
        .execute(&state.db.pool)
        .await;

    if let Err(e) = updated {
        tracing::error!("verify_email failed for {}: {:?}", claims.email, e);
    }

    Redirect::to(&frontend)
}
