//! Server configuration from the environment.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use dumpnote_core::{defaults, logging};
use dumpnote_db::{PoolConfig, RepositoryConfig};

/// Settings read at startup.
///
/// | Variable | Default |
/// |----------|---------|
/// | `DATABASE_URL` | `postgres://localhost/dumpnote` |
/// | `HOST` | `0.0.0.0` |
/// | `PORT` | `3000` |
/// | `DB_MAX_CONNECTIONS` | `10` |
/// | `DB_MIN_CONNECTIONS` | `1` |
/// | `DB_ACQUIRE_TIMEOUT_SECS` | `30` |
/// | `DB_IDLE_TIMEOUT_SECS` | `600` (`0` disables) |
/// | `DB_MAX_LIFETIME_SECS` | `1800` (`0` disables) |
/// | `USER_CACHE_CAPACITY` | `1000` |
/// | `NOTES_PAGE_SIZE` | `50` |
/// | `ID_ALLOCATION_ATTEMPTS` | `5` |
/// | `RUN_MIGRATIONS` | `true` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub user_cache_capacity: usize,
    pub page_size: u64,
    pub id_allocation_attempts: u32,
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/dumpnote".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_connections: defaults::POOL_MAX_CONNECTIONS,
            min_connections: defaults::POOL_MIN_CONNECTIONS,
            acquire_timeout_secs: defaults::POOL_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: defaults::POOL_IDLE_TIMEOUT_SECS,
            max_lifetime_secs: defaults::POOL_MAX_LIFETIME_SECS,
            user_cache_capacity: defaults::USER_CACHE_CAPACITY,
            page_size: defaults::PAGE_SIZE,
            id_allocation_attempts: defaults::ID_ALLOCATION_ATTEMPTS,
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparsable values fall back
    /// to the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(base.database_url),
            host: lookup("HOST").unwrap_or(base.host),
            port: parsed(&lookup, "PORT", base.port),
            max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", base.max_connections),
            min_connections: parsed(&lookup, "DB_MIN_CONNECTIONS", base.min_connections),
            acquire_timeout_secs: parsed(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                base.acquire_timeout_secs,
            ),
            idle_timeout_secs: parsed(&lookup, "DB_IDLE_TIMEOUT_SECS", base.idle_timeout_secs),
            max_lifetime_secs: parsed(&lookup, "DB_MAX_LIFETIME_SECS", base.max_lifetime_secs),
            user_cache_capacity: parsed(&lookup, "USER_CACHE_CAPACITY", base.user_cache_capacity),
            page_size: parsed(&lookup, "NOTES_PAGE_SIZE", base.page_size),
            id_allocation_attempts: parsed(
                &lookup,
                "ID_ALLOCATION_ATTEMPTS",
                base.id_allocation_attempts,
            ),
            run_migrations: lookup("RUN_MIGRATIONS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(base.run_migrations),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(seconds_or_off(self.idle_timeout_secs))
            .max_lifetime(seconds_or_off(self.max_lifetime_secs))
    }

    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig::default()
            .page_size(self.page_size)
            .user_cache_capacity(self.user_cache_capacity)
            .id_allocation_attempts(self.id_allocation_attempts)
    }
}

fn seconds_or_off(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(
                { logging::SUBSYSTEM } = "api",
                key,
                value = %raw,
                default = %default,
                "Ignoring unparsable setting"
            );
            default
        }),
    }
}
