//! Application configuration loaded from environment variables.

use std::env;

use yatube_infra::database::DatabaseConfig;

/// Where unauthenticated visitors are sent; `?next=<path>` is appended.
pub const DEFAULT_LOGIN_URL: &str = "/auth/login/";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub login_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let database = get("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            min_connections: get("DB_MIN_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        });

        Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            database,
            login_url: get("LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
        }
    }
}
