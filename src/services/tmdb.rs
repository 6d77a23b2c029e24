//! tmdb.rs
//!
//! Клиент метаданных TMDB. Все сетевые вызовы защищены "Автоматическим
//! выключателем": после серии сбоев внешнего API запросы блокируются на
//! таймаут, затем пропускается один пробный запрос.

use serde::Deserialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

use crate::config::{CircuitBreakerConfig, TmdbConfig};

/// Состояния выключателя.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    /// Нормальный режим, запросы разрешены.
    Closed,
    /// Режим блокировки после множественных сбоев.
    Open,
    /// Пробный режим после таймаута: разрешён один запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: std::sync::RwLock<CircuitState>,
    failure_count: AtomicU32,
    // Unix-секунды последнего сбоя
    last_failure_time: AtomicU64,
    failure_threshold: u32,
    timeout_duration: Duration,
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            state: std::sync::RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure_time: AtomicU64::new(0),
            failure_threshold,
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    pub fn can_execute(&self) -> bool {
        let state = self.state.read().unwrap();

        match *state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let last_failure = self.last_failure_time.load(Ordering::Relaxed);

                if unix_now_secs().saturating_sub(last_failure) >= self.timeout_duration.as_secs() {
                    drop(state); // отпускаем блокировку чтения перед записью
                    *self.state.write().unwrap() = CircuitState::HalfOpen;
                    info!("Circuit breaker transitioning to HalfOpen state");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.write().unwrap();

        match *state {
            CircuitState::HalfOpen => {
                *state = CircuitState::Closed;
                self.failure_count.store(0, Ordering::Relaxed);
                info!("Circuit breaker recovered - transitioning to Closed state");
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_failure_time.store(unix_now_secs(), Ordering::Relaxed);

        let mut state = self.state.write().unwrap();

        match *state {
            CircuitState::Closed => {
                if failure_count >= self.failure_threshold {
                    *state = CircuitState::Open;
                    error!(
                        "Circuit breaker OPENED - {} failures reached threshold {}",
                        failure_count, self.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("Circuit breaker test failed - returning to Open state");
            }
            _ => {}
        }
    }

    pub fn get_state(&self) -> CircuitState {
        self.state.read().unwrap().clone()
    }
}

/// Ошибки запроса через выключатель.
#[derive(Debug)]
pub enum TmdbError {
    /// Выключатель разомкнут, запрос заблокирован.
    Open,
    /// Ошибка HTTP-клиента.
    Request(reqwest::Error),
}

impl std::fmt::Display for TmdbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TmdbError::Open => write!(f, "Circuit breaker is open - TMDB temporarily unavailable"),
            TmdbError::Request(e) => write!(f, "TMDB request error: {}", e),
        }
    }
}

impl std::error::Error for TmdbError {}

// --- Модели ответов TMDB ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct TmdbMovie {
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
}

/// Клиент TMDB.
#[derive(Clone)]
pub struct TmdbClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl TmdbClient {
    pub fn from_config(config: &TmdbConfig, breaker: &CircuitBreakerConfig) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                breaker.failure_threshold,
                breaker.timeout_seconds,
            )),
        }
    }

    async fn execute_with_circuit_breaker<F, T>(&self, operation: F) -> Result<T, TmdbError>
    where
        F: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking TMDB request");
            return Err(TmdbError::Open);
        }

        match operation.await {
            Ok(result) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Err(e) => {
                error!("TMDB request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                Err(TmdbError::Request(e))
            }
        }
    }

    /// Поиск фильма по названию и году выпуска.
    pub async fn search_movie(&self, name: &str, year: i32) -> Result<Option<TmdbMovie>, TmdbError> {
        let url = format!("{}/search/movie", self.base_url);

        let operation = async {
            self.http_client
                .get(&url)
                .query(&[("query", name), ("year", &year.to_string())])
                .bearer_auth(&self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json::<SearchResponse>()
                .await
        };

        let response = self.execute_with_circuit_breaker(operation).await?;
        Ok(response.results.into_iter().next())
    }

    /// Средняя оценка фильма; None, если TMDB его не знает.
    pub async fn movie_rating(&self, name: &str, year: i32) -> Result<Option<f64>, TmdbError> {
        let movie = self.search_movie(name, year).await?;
        Ok(movie.and_then(|m| m.vote_average))
    }

    pub fn circuit_breaker_state(&self) -> CircuitState {
        self.circuit_breaker.get_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(3, 60);
        assert!(breaker.can_execute());

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn success_resets_failure_streak() {
        let breaker = CircuitBreaker::new(2, 60);
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        // серия прервана - порог не достигнут
        assert_eq!(breaker.get_state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_closes_on_success() {
        let breaker = CircuitBreaker::new(1, 0);
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);

        // таймаут нулевой - следующий запрос пробный
        assert!(breaker.can_execute());
        assert_eq!(breaker.get_state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_reopens_on_failure() {
        let breaker = CircuitBreaker::new(1, 0);
        breaker.record_failure();
        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);
    }
}
