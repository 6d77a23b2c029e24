use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Статус сеанса как отдельный тип, а не голый флаг:
// проверки по коду обязаны явно сказать, какие сеансы их интересуют.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Cancelled,
}

impl SessionStatus {
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

// В БД статус хранится колонкой is_deleted
impl TryFrom<bool> for SessionStatus {
    type Error = std::convert::Infallible;

    fn try_from(is_deleted: bool) -> Result<Self, Self::Error> {
        Ok(if is_deleted {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Active
        })
    }
}

impl From<SessionStatus> for bool {
    fn from(status: SessionStatus) -> bool {
        matches!(status, SessionStatus::Cancelled)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub movie_id: i64,
    pub hall_id: i64,
    // Канонический момент начала, всегда UTC
    pub date: DateTime<Utc>,
    pub price: f64,
    pub price_vip: f64,
    pub session_type_id: i64,
    #[sqlx(rename = "is_deleted", try_from = "bool")]
    pub status: SessionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_the_stored_flag() {
        assert_eq!(SessionStatus::try_from(false), Ok(SessionStatus::Active));
        assert_eq!(SessionStatus::try_from(true), Ok(SessionStatus::Cancelled));
        assert!(!bool::from(SessionStatus::Active));
        assert!(bool::from(SessionStatus::Cancelled));
    }

    #[test]
    fn only_active_sessions_are_bookable() {
        assert!(SessionStatus::Active.is_active());
        assert!(!SessionStatus::Cancelled.is_active());
    }
}
