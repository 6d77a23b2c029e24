use crate::models::booking::BookedSeat;
use crate::{database::Database, redis_client::RedisClient};
use futures::StreamExt;
use redis::AsyncCommands;
use tracing::info;

// Карты занятых мест горячих сеансов живут в Redis и сбрасываются
// при каждой записи по сеансу. Кеш не источник истины: любой сбой
// Redis прозрачно уводит чтение в Postgres.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
}

const SEATS_TTL_SECS: u64 = 3600;
const WARMUP_SESSIONS: i64 = 50;
const WARMUP_CONCURRENCY: usize = 8;

impl CacheService {
    pub fn new(redis: RedisClient, db: Database) -> Self {
        Self { redis, db }
    }

    // Прогрев кеша при старте: карты мест ближайших сеансов
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        let upcoming: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM sessions
             WHERE is_deleted = FALSE AND date > NOW()
             ORDER BY date
             LIMIT $1",
        )
        .bind(WARMUP_SESSIONS)
        .fetch_all(&self.db.pool)
        .await
        .unwrap_or_default();

        let total = upcoming.len();
        futures::stream::iter(upcoming)
            .for_each_concurrent(WARMUP_CONCURRENCY, |session_id| async move {
                let _ = self.get_booked_seats(session_id).await;
            })
            .await;

        info!("Cache warmup done, {} sessions preloaded", total);
    }

    // Занятые места сеанса: сначала кеш, при промахе - БД с записью в кеш
    pub async fn get_booked_seats(&self, session_id: i64) -> Result<Vec<BookedSeat>, sqlx::Error> {
        if let Ok(seats) = self.get_seats_from_cache(session_id).await {
            return Ok(seats);
        }

        let seats = self.load_seats_from_db(session_id).await?;
        let _ = self.save_seats_to_cache(session_id, &seats).await;
        Ok(seats)
    }

    // Инвалидировать карту мест сеанса
    pub async fn invalidate_session(&self, session_id: i64) {
        self.redis.forget(&Self::seats_key(session_id)).await;
        info!("Invalidated seats cache for session {}", session_id);
    }

    fn seats_key(session_id: i64) -> String {
        format!("session:{}:seats", session_id)
    }

    // === Работа с БД ===

    async fn load_seats_from_db(&self, session_id: i64) -> Result<Vec<BookedSeat>, sqlx::Error> {
        sqlx::query_as::<_, BookedSeat>(
            "SELECT seat_row AS row, seat_col AS col, is_vip
             FROM bookings
             WHERE session_id = $1
             ORDER BY seat_row, seat_col",
        )
        .bind(session_id)
        .fetch_all(&self.db.pool)
        .await
    }

    // === Работа с кешем ===

    async fn get_seats_from_cache(&self, session_id: i64) -> Result<Vec<BookedSeat>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: String = conn.get(Self::seats_key(session_id)).await?;
        let seats: Vec<BookedSeat> = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(seats)
    }

    async fn save_seats_to_cache(
        &self,
        session_id: i64,
        seats: &[BookedSeat],
    ) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(seats).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(Self::seats_key(session_id), data, SEATS_TTL_SECS).await
    }
}
