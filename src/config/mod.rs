use chrono_tz::Tz;
use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub cinema: CinemaConfig,
    pub tmdb: TmdbConfig,
    pub email: EmailConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub frontend_url: String,
    pub server_url: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Настройки JWT: отдельные секреты для access, refresh и email-токенов
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub email_secret: String,
    pub access_expires_in_hours: i64,
    pub refresh_expires_in_days: i64,
}

// Настройки кинотеатра: референсная таймзона и технический перерыв между сеансами.
// Инвариант непересечения сеансов определяется этими двумя значениями,
// поэтому они живут в конфиге, а не разбросаны константами по коду.
#[derive(Debug, Clone, Deserialize)]
pub struct CinemaConfig {
    pub timezone: Tz,
    pub buffer_minutes: i64,
}

// Настройки клиента TMDB
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub api_url: String,
    pub api_key: String,
}

// Настройки почтового API
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

// Настройки Circuit Breaker для внешних HTTP-клиентов
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_system=debug,tower_http=debug".to_string()),
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                server_url: env::var("SERVER_URL")
                    .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            },
            jwt: JwtConfig {
                access_secret: env::var("ACCESS_TOKEN_SECRET").expect("ACCESS_TOKEN_SECRET must be set"),
                refresh_secret: env::var("REFRESH_TOKEN_SECRET").expect("REFRESH_TOKEN_SECRET must be set"),
                email_secret: env::var("EMAIL_VERIFY_TOKEN_SECRET")
                    .expect("EMAIL_VERIFY_TOKEN_SECRET must be set"),
                access_expires_in_hours: env::var("ACCESS_TOKEN_EXPIRES_IN_HOURS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("ACCESS_TOKEN_EXPIRES_IN_HOURS must be a valid number"),
                refresh_expires_in_days: env::var("REFRESH_TOKEN_EXPIRES_IN_DAYS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .expect("REFRESH_TOKEN_EXPIRES_IN_DAYS must be a valid number"),
            },
            cinema: CinemaConfig {
                timezone: env::var("CINEMA_TIMEZONE")
                    .unwrap_or_else(|_| "Europe/Kyiv".to_string())
                    .parse()
                    .expect("CINEMA_TIMEZONE must be a valid IANA timezone"),
                buffer_minutes: env::var("SESSION_BUFFER_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .expect("SESSION_BUFFER_MINUTES must be a valid number"),
            },
            tmdb: TmdbConfig {
                api_url: env::var("TMDB_API_URL")
                    .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string()),
                api_key: env::var("TMDB_API_KEY").expect("TMDB_API_KEY must be set"),
            },
            email: EmailConfig {
                api_url: env::var("EMAIL_API_URL").expect("EMAIL_API_URL must be set"),
                api_key: env::var("EMAIL_API_KEY").expect("EMAIL_API_KEY must be set"),
                from: env::var("EMAIL_FROM").expect("EMAIL_FROM must be set"),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env::var("CIRCUIT_BREAKER_FAILURE_THRESHOLD")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("CIRCUIT_BREAKER_FAILURE_THRESHOLD must be a valid number"),
                timeout_seconds: env::var("CIRCUIT_BREAKER_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("CIRCUIT_BREAKER_TIMEOUT_SECONDS must be a valid number"),
            },
        }
    }
}
