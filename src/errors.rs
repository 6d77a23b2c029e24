//! errors.rs
//!
//! Единая таксономия ошибок API.
//!
//! Четыре класса:
//! 1.  Ошибки формы запроса (дата в неверном формате, пустой объект обновления) -
//!     отклоняются до обращения к хранилищу.
//! 2.  Референсные ошибки (неизвестный фильм / зал / тип сеанса / сеанс) -
//!     после промаха по справочнику.
//! 3.  Нарушения доменных инвариантов (конфликт расписания, место занято,
//!     место вне сетки зала) - всегда со структурными деталями для клиента.
//! 4.  Внутренние ошибки - логируются с контекстом, клиенту отдаётся
//!     непрозрачный 500 без внутренних деталей.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    // --- Ошибки формы запроса ---
    #[error("Дата должна быть в формате \"YYYY-MM-DDTHH:mm:ss\" или \"YYYY-MM-DD HH:mm:ss\"!")]
    MalformedDate,

    #[error("Все сеансы должны иметь уникальные даты.")]
    DuplicateDate,

    #[error("Отсутствуют поля для обновления!")]
    EmptyUpdate,

    #[error("Объект с индексом {0} пустой.")]
    EmptyUpdateAt(usize),

    #[error("Нужно указать хотя бы один сеанс.")]
    NoSessions,

    #[error("Некорректный параметр запроса!")]
    BadQueryParam,

    #[error("{0}")]
    Validation(String),

    // --- Референсные ошибки ---
    #[error("Фильм с ID {0} не найден")]
    UnknownMovie(i64),

    #[error("Зал с id {0} не найден!")]
    UnknownHall(i64),

    #[error("Тип сеанса с id {0} не найден!")]
    UnknownSessionType(i64),

    #[error("Сеанс с id {0} не найден!")]
    UnknownSession(i64),

    #[error("Возрастной рейтинг с ID {0} не существует!")]
    UnknownAgeRate(i64),

    #[error("Фильм не найден")]
    MovieNotFound,

    #[error("Пользователя не существует")]
    UnknownUser,

    // --- Нарушения доменных инвариантов ---
    #[error(
        "Сеанс в {proposed} в зале {hall_name} конфликтует с сеансом в {existing}{}",
        conflict_note(.conflicting_movie)
    )]
    SchedulingConflict {
        hall_name: String,
        proposed: String,
        existing: String,
        // Фильм конфликтующего сеанса, когда он известен валидатору
        conflicting_movie: Option<String>,
    },

    #[error("Место [{row}, {col}] вне сетки зала.")]
    SeatOutOfRange { row: i32, col: i32 },

    #[error("Место [{row}, {col}] уже забронировано на сеанс {session_id}.")]
    SeatAlreadyBooked {
        row: i32,
        col: i32,
        session_id: i64,
    },

    // --- Аутентификация / авторизация ---
    #[error("Неправильный пароль или email.")]
    InvalidCredentials,

    #[error("Email {0} уже зарегистрирован.")]
    EmailTaken(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Доступ запрещён. Только для администраторов.")]
    AdminOnly,

    // --- Внутренние ---
    #[error("Произошла неожиданная ошибка.")]
    Internal(#[source] anyhow::Error),
}

fn conflict_note(movie: &Option<String>) -> String {
    match movie {
        Some(movie) => format!(" ({movie})"),
        None => String::new(),
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedDate
            | ApiError::DuplicateDate
            | ApiError::EmptyUpdate
            | ApiError::EmptyUpdateAt(_)
            | ApiError::NoSessions
            | ApiError::BadQueryParam
            | ApiError::Validation(_)
            | ApiError::UnknownHall(_)
            | ApiError::UnknownSessionType(_)
            | ApiError::UnknownAgeRate(_)
            | ApiError::SchedulingConflict { .. }
            | ApiError::SeatOutOfRange { .. }
            | ApiError::SeatAlreadyBooked { .. } => StatusCode::BAD_REQUEST,

            ApiError::UnknownMovie(_)
            | ApiError::UnknownSession(_)
            | ApiError::UnknownUser
            | ApiError::MovieNotFound => StatusCode::NOT_FOUND,

            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredentials | ApiError::AdminOnly => StatusCode::FORBIDDEN,
            ApiError::EmailTaken(_) => StatusCode::CONFLICT,

            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Внутренние детали не утекают клиенту, только в лог
        if let ApiError::Internal(ref e) = self {
            tracing::error!("internal error: {:?}", e);
        }

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_contains_both_instants_and_hall() {
        let err = ApiError::SchedulingConflict {
            hall_name: "Зал 2".to_string(),
            proposed: "2025-06-28 16:00:00".to_string(),
            existing: "2025-06-28 15:30:00".to_string(),
            conflicting_movie: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("Зал 2"));
        assert!(msg.contains("2025-06-28 16:00:00"));
        assert!(msg.contains("2025-06-28 15:30:00"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_note_mentions_the_other_movie_when_known() {
        let err = ApiError::SchedulingConflict {
            hall_name: "Зал 1".to_string(),
            proposed: "2025-07-01 19:30:00".to_string(),
            existing: "2025-07-01 18:00:00".to_string(),
            conflicting_movie: Some("фильм «Матрица», 136 мин.".to_string()),
        };
        assert!(err.to_string().ends_with("(фильм «Матрица», 136 мин.)"));
    }

    #[test]
    fn invariant_violations_map_to_bad_request() {
        assert_eq!(
            ApiError::SeatOutOfRange { row: 11, col: 1 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::SeatAlreadyBooked { row: 5, col: 6, session_id: 1 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::DuplicateDate.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn referential_misses_map_to_not_found() {
        assert_eq!(ApiError::UnknownMovie(42).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::UnknownSession(7).status(), StatusCode::NOT_FOUND);
        // зал и тип сеанса проверяются в теле запроса, поэтому 400
        assert_eq!(ApiError::UnknownHall(9).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_error_is_opaque() {
        let err = ApiError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Произошла неожиданная ошибка.");
    }
}
