//! scheduling.rs
//!
//! Планировщик сеансов: проверка пачки предложенных сеансов на пересечения
//! и атомарная запись вместе с сопутствующими сущностями.
//!
//! Ключевые правила:
//! 1.  Внутри одной пачки все старты уникальны (глобально, по всем залам).
//! 2.  Внутри одного зала сеансы пачки не пересекаются между собой с учётом
//!     технического перерыва: `curr.start >= prev.start + prev.duration + buffer`.
//! 3.  Каждое предложение сверяется с ближайшими сохранёнными соседями по залу
//!     (предыдущим и следующим), отменённые сеансы не учитываются.
//! 4.  Проверки и запись идут в одной транзакции под advisory-блокировкой
//!     каждого затронутого зала, поэтому две конкурирующие пачки не могут
//!     обе пройти валидацию по устаревшему снимку.
//!
//! Все операции принимают соединение открытой транзакции явным параметром -
//! координатор фильма и сеансов переиспользует их внутри своей транзакции.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgConnection;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

use crate::errors::ApiError;
use crate::models::SessionStatus;
use crate::services::clock::Clock;

// Пространство ключей advisory-блокировок залов
const HALL_LOCK_NS: i64 = 0xC1EA;

/// Предложенный сеанс после нормализации даты.
#[derive(Debug, Clone)]
pub struct SessionProposal {
    pub movie_id: i64,
    pub start: DateTime<Utc>,
    pub price: f64,
    pub price_vip: f64,
    pub hall_id: i64,
    pub session_type_id: i64,
}

/// Сеанс нового фильма: то же самое, но фильм ещё не существует.
#[derive(Debug, Clone)]
pub struct MovieSessionProposal {
    pub start: DateTime<Utc>,
    pub price: f64,
    pub price_vip: f64,
    pub hall_id: i64,
    pub session_type_id: i64,
}

/// Частичное обновление сеанса. Все поля опциональны,
/// полностью пустое обновление отклоняется.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub date: Option<DateTime<Utc>>,
    pub price: Option<f64>,
    pub price_vip: Option<f64>,
    pub hall_id: Option<i64>,
    pub session_type_id: Option<i64>,
    pub status: Option<SessionStatus>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.price.is_none()
            && self.price_vip.is_none()
            && self.hall_id.is_none()
            && self.session_type_id.is_none()
            && self.status.is_none()
    }
}

/// Карточка нового фильма для координатора "фильм + сеансы".
#[derive(Debug, Clone)]
pub struct NewMovie {
    pub name: String,
    pub description: String,
    pub duration: i32,
    pub year: i32,
    pub age_rate_id: i64,
    pub rating: f64,
    pub poster_url: String,
    pub trailer_url: String,
    pub genres: Vec<String>,
    pub directors: Vec<(String, String)>,
    pub actors: Vec<(String, String)>,
    pub studios: Vec<String>,
}

// Слот расписания: занятый интервал [start, start + duration + buffer)
#[derive(Debug, Clone, Copy)]
struct Slot {
    hall_id: i64,
    start: DateTime<Utc>,
    duration_min: i64,
}

// Конфликт внутри пачки: зал и оба старта, existing < proposed
#[derive(Debug, Clone, Copy, PartialEq)]
struct BatchConflict {
    hall_id: i64,
    existing: DateTime<Utc>,
    proposed: DateTime<Utc>,
    proposed_index: usize,
}

#[derive(Debug, sqlx::FromRow)]
struct MovieRef {
    id: i64,
    name: String,
    duration: i32,
}

// Сохранённый сосед по залу вместе с фильмом для диагностики
#[derive(Debug, sqlx::FromRow)]
struct NeighborRow {
    date: DateTime<Utc>,
    duration: i32,
    name: String,
}

#[derive(Clone)]
pub struct SchedulingService {
    clock: Clock,
    buffer: Duration,
}

impl SchedulingService {
    pub fn new(clock: Clock, buffer_minutes: i64) -> Self {
        Self {
            clock,
            buffer: Duration::minutes(buffer_minutes),
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Добавляет пачку сеансов. Либо записывается вся пачка, либо ничего.
    /// Возвращает количество добавленных сеансов.
    pub async fn add_sessions(
        &self,
        conn: &mut PgConnection,
        proposals: &[SessionProposal],
    ) -> Result<usize, ApiError> {
        if proposals.is_empty() {
            return Err(ApiError::NoSessions);
        }

        // дубликаты стартов отсекаются до любых обращений к хранилищу
        let mut seen = HashSet::new();
        if !proposals.iter().all(|p| seen.insert(p.start)) {
            return Err(ApiError::DuplicateDate);
        }

        let movies = self.resolve_movies(conn, proposals).await?;
        let halls = self
            .resolve_halls(conn, proposals.iter().map(|p| p.hall_id))
            .await?;
        self.check_session_types(conn, proposals.iter().map(|p| p.session_type_id))
            .await?;

        // блокируем залы в отсортированном порядке и только после этого
        // смотрим на соседей: иначе две пачки проходят проверку по одному
        // и тому же снимку и обе записываются
        let mut hall_ids: Vec<i64> = halls.keys().copied().collect();
        hall_ids.sort_unstable();
        for hall_id in &hall_ids {
            super::acquire_xact_lock(conn, HALL_LOCK_NS, *hall_id).await?;
        }

        let slots: Vec<Slot> = proposals
            .iter()
            .map(|p| Slot {
                hall_id: p.hall_id,
                start: p.start,
                duration_min: movies[&p.movie_id].duration as i64,
            })
            .collect();

        if let Some(c) = first_batch_conflict(&slots, self.buffer) {
            let movie = &movies[&proposals[c.proposed_index].movie_id];
            return Err(self.conflict(
                &halls[&c.hall_id],
                c.proposed,
                c.existing,
                Some((movie.name.clone(), movie.duration)),
            ));
        }

        for slot in &slots {
            self.check_against_persisted(conn, slot, None, &halls[&slot.hall_id])
                .await?;
        }

        for p in proposals {
            sqlx::query(
                "INSERT INTO sessions (movie_id, hall_id, date, price, price_vip, session_type_id)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(p.movie_id)
            .bind(p.hall_id)
            .bind(p.start)
            .bind(p.price)
            .bind(p.price_vip)
            .bind(p.session_type_id)
            .execute(&mut *conn)
            .await?;
        }

        self.widen_movie_windows(conn, proposals).await?;

        info!("scheduled {} sessions across {} halls", proposals.len(), hall_ids.len());
        Ok(proposals.len())
    }

    /// Координатор "новый фильм + его сеансы" одной атомарной единицей:
    /// фильм, жанры, актёры, режиссёры, студии и расписание.
    pub async fn create_movie_with_sessions(
        &self,
        conn: &mut PgConnection,
        movie: &NewMovie,
        sessions: &[MovieSessionProposal],
    ) -> Result<i64, ApiError> {
        if sessions.is_empty() {
            return Err(ApiError::NoSessions);
        }

        let rate_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM age_rates WHERE id = $1)")
                .bind(movie.age_rate_id)
                .fetch_one(&mut *conn)
                .await?;
        if !rate_exists {
            return Err(ApiError::UnknownAgeRate(movie.age_rate_id));
        }

        let movie_id: i64 = sqlx::query_scalar(
            "INSERT INTO movies (name, description, duration, year, rate_id, rating, poster_url, trailer_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(&movie.name)
        .bind(&movie.description)
        .bind(movie.duration)
        .bind(movie.year)
        .bind(movie.age_rate_id)
        .bind(movie.rating)
        .bind(&movie.poster_url)
        .bind(&movie.trailer_url)
        .fetch_one(&mut *conn)
        .await?;

        for genre in &movie.genres {
            let genre_id: i64 = sqlx::query_scalar(
                "INSERT INTO genres (name) VALUES ($1)
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                 RETURNING id",
            )
            .bind(genre)
            .fetch_one(&mut *conn)
            .await?;

            sqlx::query("INSERT INTO movie_genres (movie_id, genre_id) VALUES ($1, $2)")
                .bind(movie_id)
                .bind(genre_id)
                .execute(&mut *conn)
                .await?;
        }

        self.link_people(conn, movie_id, "directors", "movie_directors", "director_id", &movie.directors)
            .await?;
        self.link_people(conn, movie_id, "actors", "movie_actors", "actor_id", &movie.actors)
            .await?;

        for studio in &movie.studios {
            let studio_id: i64 = sqlx::query_scalar(
                "INSERT INTO studios (name) VALUES ($1)
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                 RETURNING id",
            )
            .bind(studio)
            .fetch_one(&mut *conn)
            .await?;

            sqlx::query("INSERT INTO movie_studios (movie_id, studio_id) VALUES ($1, $2)")
                .bind(movie_id)
                .bind(studio_id)
                .execute(&mut *conn)
                .await?;
        }

        let proposals: Vec<SessionProposal> = sessions
            .iter()
            .map(|s| SessionProposal {
                movie_id,
                start: s.start,
                price: s.price,
                price_vip: s.price_vip,
                hall_id: s.hall_id,
                session_type_id: s.session_type_id,
            })
            .collect();

        self.add_sessions(conn, &proposals).await?;

        info!("movie {} created with {} sessions", movie_id, sessions.len());
        Ok(movie_id)
    }

    /// Частичное обновление одного сеанса. Перепланирование запускается
    /// только если меняется зал, дата или отменённый сеанс возвращается
    /// в расписание; ценовые правки валидатор не трогают.
    pub async fn update_session(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        upd: &SessionUpdate,
    ) -> Result<(), ApiError> {
        if upd.is_empty() {
            return Err(ApiError::EmptyUpdate);
        }

        let current: Option<(i64, DateTime<Utc>, i32, bool)> = sqlx::query_as(
            "SELECT s.hall_id, s.date, m.duration, s.is_deleted
             FROM sessions s
             JOIN movies m ON m.id = s.movie_id
             WHERE s.id = $1",
        )
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;

        let (cur_hall, cur_date, duration, is_deleted) =
            current.ok_or(ApiError::UnknownSession(session_id))?;

        if let Some(hall_id) = upd.hall_id {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM halls WHERE id = $1)")
                    .bind(hall_id)
                    .fetch_one(&mut *conn)
                    .await?;
            if !exists {
                return Err(ApiError::UnknownHall(hall_id));
            }
        }

        if let Some(type_id) = upd.session_type_id {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM session_types WHERE id = $1)")
                    .bind(type_id)
                    .fetch_one(&mut *conn)
                    .await?;
            if !exists {
                return Err(ApiError::UnknownSessionType(type_id));
            }
        }

        let target_hall = upd.hall_id.unwrap_or(cur_hall);
        let target_start = upd.date.unwrap_or(cur_date);
        let target_status = upd
            .status
            .unwrap_or(if is_deleted { SessionStatus::Cancelled } else { SessionStatus::Active });

        // возврат отменённого сеанса в сетку - тоже повод для проверки слота
        let slot_changed = upd.date.is_some()
            || upd.hall_id.is_some()
            || (is_deleted && target_status.is_active());

        if slot_changed && target_status.is_active() {
            super::acquire_xact_lock(conn, HALL_LOCK_NS, target_hall).await?;

            let hall_name: Option<String> =
                sqlx::query_scalar("SELECT name FROM halls WHERE id = $1")
                    .bind(target_hall)
                    .fetch_optional(&mut *conn)
                    .await?;
            let hall_name = hall_name.ok_or(ApiError::UnknownHall(target_hall))?;

            let slot = Slot {
                hall_id: target_hall,
                start: target_start,
                duration_min: duration as i64,
            };
            self.check_against_persisted(conn, &slot, Some(session_id), &hall_name)
                .await?;
        }

        // динамический UPDATE только по заданным полям
        let mut sets: Vec<String> = Vec::new();
        let mut idx = 1;
        if upd.date.is_some() {
            sets.push(format!("date = ${idx}"));
            idx += 1;
        }
        if upd.price.is_some() {
            sets.push(format!("price = ${idx}"));
            idx += 1;
        }
        if upd.price_vip.is_some() {
            sets.push(format!("price_vip = ${idx}"));
            idx += 1;
        }
        if upd.hall_id.is_some() {
            sets.push(format!("hall_id = ${idx}"));
            idx += 1;
        }
        if upd.session_type_id.is_some() {
            sets.push(format!("session_type_id = ${idx}"));
            idx += 1;
        }
        if upd.status.is_some() {
            sets.push(format!("is_deleted = ${idx}"));
            idx += 1;
        }

        let q = format!(
            "UPDATE sessions SET {} WHERE id = ${idx}",
            sets.join(", ")
        );

        let mut query = sqlx::query(&q);
        if let Some(date) = upd.date {
            query = query.bind(date);
        }
        if let Some(price) = upd.price {
            query = query.bind(price);
        }
        if let Some(price_vip) = upd.price_vip {
            query = query.bind(price_vip);
        }
        if let Some(hall_id) = upd.hall_id {
            query = query.bind(hall_id);
        }
        if let Some(type_id) = upd.session_type_id {
            query = query.bind(type_id);
        }
        if let Some(status) = upd.status {
            query = query.bind(bool::from(status));
        }
        query.bind(session_id).execute(&mut *conn).await?;

        Ok(())
    }

    /// Пакетное обновление: пустой объект в любом месте пачки
    /// отклоняет её целиком ещё до первой записи.
    pub async fn update_sessions(
        &self,
        conn: &mut PgConnection,
        items: &[(i64, SessionUpdate)],
    ) -> Result<(), ApiError> {
        for (i, (_, upd)) in items.iter().enumerate() {
            if upd.is_empty() {
                return Err(ApiError::EmptyUpdateAt(i));
            }
        }

        for (session_id, upd) in items {
            self.update_session(conn, *session_id, upd).await?;
        }
        Ok(())
    }

    // --- Внутренности ---

    // Сосед слева (start <= p.start) и справа (start >= p.start) по залу,
    // отменённые и исключённый сеанс не учитываются. Совпадающий старт
    // попадает в обе выборки и отлавливается проверкой слева.
    async fn check_against_persisted(
        &self,
        conn: &mut PgConnection,
        slot: &Slot,
        exclude_session_id: Option<i64>,
        hall_name: &str,
    ) -> Result<(), ApiError> {
        let prev: Option<NeighborRow> = sqlx::query_as(
            "SELECT s.date, m.duration, m.name
             FROM sessions s
             JOIN movies m ON m.id = s.movie_id
             WHERE s.hall_id = $1
               AND s.is_deleted = FALSE
               AND s.date <= $2
               AND ($3::BIGINT IS NULL OR s.id <> $3)
             ORDER BY s.date DESC
             LIMIT 1",
        )
        .bind(slot.hall_id)
        .bind(slot.start)
        .bind(exclude_session_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(prev) = prev {
            let prev_end = prev.date + Duration::minutes(prev.duration as i64) + self.buffer;
            if slot.start < prev_end {
                return Err(self.conflict(
                    hall_name,
                    slot.start,
                    prev.date,
                    Some((prev.name, prev.duration)),
                ));
            }
        }

        let next: Option<NeighborRow> = sqlx::query_as(
            "SELECT s.date, m.duration, m.name
             FROM sessions s
             JOIN movies m ON m.id = s.movie_id
             WHERE s.hall_id = $1
               AND s.is_deleted = FALSE
               AND s.date >= $2
               AND ($3::BIGINT IS NULL OR s.id <> $3)
             ORDER BY s.date ASC
             LIMIT 1",
        )
        .bind(slot.hall_id)
        .bind(slot.start)
        .bind(exclude_session_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(next) = next {
            let slot_end = slot.start + Duration::minutes(slot.duration_min) + self.buffer;
            if slot_end > next.date {
                return Err(self.conflict(
                    hall_name,
                    slot.start,
                    next.date,
                    Some((next.name, next.duration)),
                ));
            }
        }

        Ok(())
    }

    fn conflict(
        &self,
        hall_name: &str,
        proposed: DateTime<Utc>,
        existing: DateTime<Utc>,
        movie: Option<(String, i32)>,
    ) -> ApiError {
        ApiError::SchedulingConflict {
            hall_name: hall_name.to_string(),
            proposed: self.clock.format(proposed),
            existing: self.clock.format(existing),
            conflicting_movie: movie.map(|(name, duration)| format!("фильм «{name}», {duration} мин.")),
        }
    }

    // Длительности и названия фильмов пачки одной выборкой,
    // первый отсутствующий фильм - референсная ошибка
    async fn resolve_movies(
        &self,
        conn: &mut PgConnection,
        proposals: &[SessionProposal],
    ) -> Result<HashMap<i64, MovieRef>, ApiError> {
        let ids: Vec<i64> = proposals.iter().map(|p| p.movie_id).collect();

        let rows: Vec<MovieRef> =
            sqlx::query_as("SELECT id, name, duration FROM movies WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&mut *conn)
                .await?;

        let movies: HashMap<i64, MovieRef> = rows.into_iter().map(|m| (m.id, m)).collect();

        for p in proposals {
            if !movies.contains_key(&p.movie_id) {
                return Err(ApiError::UnknownMovie(p.movie_id));
            }
        }
        Ok(movies)
    }

    async fn resolve_halls(
        &self,
        conn: &mut PgConnection,
        hall_ids: impl Iterator<Item = i64>,
    ) -> Result<BTreeMap<i64, String>, ApiError> {
        let requested: Vec<i64> = hall_ids.collect();

        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM halls WHERE id = ANY($1)")
                .bind(&requested)
                .fetch_all(&mut *conn)
                .await?;

        let halls: BTreeMap<i64, String> = rows.into_iter().collect();

        for id in &requested {
            if !halls.contains_key(id) {
                return Err(ApiError::UnknownHall(*id));
            }
        }
        Ok(halls)
    }

    async fn check_session_types(
        &self,
        conn: &mut PgConnection,
        type_ids: impl Iterator<Item = i64>,
    ) -> Result<(), ApiError> {
        let requested: Vec<i64> = type_ids.collect();

        let known: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM session_types WHERE id = ANY($1)")
                .bind(&requested)
                .fetch_all(&mut *conn)
                .await?;
        let known: HashSet<i64> = known.into_iter().collect();

        for id in &requested {
            if !known.contains(id) {
                return Err(ApiError::UnknownSessionType(*id));
            }
        }
        Ok(())
    }

    // Окно видимости фильма растягивается до границ нового расписания
    async fn widen_movie_windows(
        &self,
        conn: &mut PgConnection,
        proposals: &[SessionProposal],
    ) -> Result<(), ApiError> {
        let mut windows: HashMap<i64, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();
        for p in proposals {
            windows
                .entry(p.movie_id)
                .and_modify(|(min, max)| {
                    if p.start < *min {
                        *min = p.start;
                    }
                    if p.start > *max {
                        *max = p.start;
                    }
                })
                .or_insert((p.start, p.start));
        }

        for (movie_id, (min, max)) in windows {
            sqlx::query(
                "UPDATE movies
                 SET created_at = LEAST(COALESCE(created_at, $2), $2),
                     expires_at = GREATEST(COALESCE(expires_at, $3), $3)
                 WHERE id = $1",
            )
            .bind(movie_id)
            .bind(min)
            .bind(max)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn link_people(
        &self,
        conn: &mut PgConnection,
        movie_id: i64,
        people_table: &str,
        link_table: &str,
        link_column: &str,
        people: &[(String, String)],
    ) -> Result<(), ApiError> {
        for (first_name, last_name) in people {
            let person_id: i64 = sqlx::query_scalar(&format!(
                "INSERT INTO {people_table} (first_name, last_name) VALUES ($1, $2)
                 ON CONFLICT (first_name, last_name) DO UPDATE SET first_name = EXCLUDED.first_name
                 RETURNING id"
            ))
            .bind(first_name)
            .bind(last_name)
            .fetch_one(&mut *conn)
            .await?;

            sqlx::query(&format!(
                "INSERT INTO {link_table} (movie_id, {link_column}) VALUES ($1, $2)"
            ))
            .bind(movie_id)
            .bind(person_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

// Первый конфликт внутри пачки: залы обходим по возрастанию id, внутри зала
// сеансы по возрастанию старта - повторная подача той же пачки даёт тот же
// самый конфликт
fn first_batch_conflict(slots: &[Slot], buffer: Duration) -> Option<BatchConflict> {
    let mut by_hall: BTreeMap<i64, Vec<(usize, &Slot)>> = BTreeMap::new();
    for (i, slot) in slots.iter().enumerate() {
        by_hall.entry(slot.hall_id).or_default().push((i, slot));
    }

    for (hall_id, mut group) in by_hall {
        group.sort_by_key(|(_, s)| s.start);

        for pair in group.windows(2) {
            let (_, prev) = pair[0];
            let (curr_idx, curr) = pair[1];
            let prev_end = prev.start + Duration::minutes(prev.duration_min) + buffer;
            if curr.start < prev_end {
                return Some(BatchConflict {
                    hall_id,
                    existing: prev.start,
                    proposed: curr.start,
                    proposed_index: curr_idx,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    const BUFFER: i64 = 15;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, h, m, 0).unwrap()
    }

    fn slot(hall_id: i64, start: DateTime<Utc>, duration_min: i64) -> Slot {
        Slot { hall_id, start, duration_min }
    }

    // Зал занят до 20:15 (18:00 + 120 мин + перерыв): 19:30 конфликтует,
    // 20:15 проходит впритык
    #[test]
    fn rejects_start_inside_occupied_interval() {
        let slots = vec![slot(1, at(18, 0), 120), slot(1, at(19, 30), 120)];
        let c = first_batch_conflict(&slots, Duration::minutes(BUFFER)).unwrap();
        assert_eq!(c.hall_id, 1);
        assert_eq!(c.existing, at(18, 0));
        assert_eq!(c.proposed, at(19, 30));
    }

    #[test]
    fn accepts_start_exactly_after_buffer() {
        let slots = vec![slot(1, at(18, 0), 120), slot(1, at(20, 15), 120)];
        assert!(first_batch_conflict(&slots, Duration::minutes(BUFFER)).is_none());
    }

    #[test]
    fn one_minute_before_buffer_end_conflicts() {
        let slots = vec![slot(1, at(18, 0), 120), slot(1, at(20, 14), 120)];
        assert!(first_batch_conflict(&slots, Duration::minutes(BUFFER)).is_some());
    }

    #[test]
    fn different_halls_do_not_conflict() {
        let slots = vec![slot(1, at(18, 0), 120), slot(2, at(18, 0), 120)];
        assert!(first_batch_conflict(&slots, Duration::minutes(BUFFER)).is_none());
    }

    // порядок подачи не важен - внутри зала сортируем по старту
    #[test]
    fn unsorted_batch_is_sorted_before_checking() {
        let slots = vec![
            slot(1, at(22, 0), 60),
            slot(1, at(18, 0), 120),
            slot(1, at(20, 15), 90),
        ];
        assert!(first_batch_conflict(&slots, Duration::minutes(BUFFER)).is_none());

        let slots = vec![slot(1, at(20, 0), 60), slot(1, at(18, 0), 120)];
        let c = first_batch_conflict(&slots, Duration::minutes(BUFFER)).unwrap();
        assert_eq!(c.proposed, at(20, 0));
        assert_eq!(c.proposed_index, 0);
    }

    #[test]
    fn resubmitting_the_same_batch_reports_the_same_conflict() {
        let slots = vec![
            slot(2, at(12, 0), 100),
            slot(1, at(18, 0), 120),
            slot(1, at(19, 30), 90),
            slot(2, at(13, 0), 100),
        ];
        let first = first_batch_conflict(&slots, Duration::minutes(BUFFER)).unwrap();
        let second = first_batch_conflict(&slots, Duration::minutes(BUFFER)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(SessionUpdate::default().is_empty());
        let upd = SessionUpdate { price: Some(150.0), ..Default::default() };
        assert!(!upd.is_empty());
    }

    proptest! {
        // Инвариант: пачка, прошедшая проверку, попарно не пересекается
        // с учётом перерыва в каждом зале
        #[test]
        fn accepted_batches_are_pairwise_disjoint(
            starts in prop::collection::vec(0i64..10_000, 1..12),
            durations in prop::collection::vec(1i64..300, 12),
            halls in prop::collection::vec(1i64..4, 12),
        ) {
            let slots: Vec<Slot> = starts
                .iter()
                .zip(&durations)
                .zip(&halls)
                .map(|((s, d), h)| slot(*h, at(0, 0) + Duration::minutes(*s), *d))
                .collect();

            if first_batch_conflict(&slots, Duration::minutes(BUFFER)).is_none() {
                for a in &slots {
                    for b in &slots {
                        if std::ptr::eq(a, b) || a.hall_id != b.hall_id {
                            continue;
                        }
                        let (first, second) = if a.start <= b.start { (a, b) } else { (b, a) };
                        let first_end =
                            first.start + Duration::minutes(first.duration_min + BUFFER);
                        prop_assert!(second.start >= first_end);
                    }
                }
            }
        }
    }
}
