pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;

use std::sync::Arc;
use tokio::task;

use services::clock::Clock;
use services::email::EmailClient;
use services::scheduling::SchedulingService;
use services::tmdb::TmdbClient;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub scheduling: SchedulingService,
    pub tmdb: TmdbClient,
    pub email: EmailClient,
}

impl AppState {
    pub async fn new(config: config::Config) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        let cache = cache::CacheService::new(redis.clone(), db.clone());

        let clock = Clock::new(config.cinema.timezone);
        let scheduling = SchedulingService::new(clock, config.cinema.buffer_minutes);
        let tmdb = TmdbClient::from_config(&config.tmdb, &config.circuit_breaker);
        let email = EmailClient::from_config(&config.email);

        let state = Arc::new(Self {
            db,
            redis,
            cache,
            config,
            scheduling,
            tmdb,
            email,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warmup cache в фоне
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}
