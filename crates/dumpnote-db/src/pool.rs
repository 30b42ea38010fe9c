//! Connection pool setup.
//!
//! Every repository shares one [`PgPool`]. [`PoolConfig`] carries the sizing
//! and timeout knobs read at startup.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use dumpnote_core::{defaults, logging, Error, Result};

/// Sizing and timeouts for the shared pool.
///
/// `None` disables the idle timeout or lifetime cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::POOL_MAX_CONNECTIONS,
            min_connections: defaults::POOL_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::POOL_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Some(Duration::from_secs(defaults::POOL_IDLE_TIMEOUT_SECS)),
            max_lifetime: Some(Duration::from_secs(defaults::POOL_MAX_LIFETIME_SECS)),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// The floor actually applied: never above the ceiling, and the ceiling
    /// is at least one connection.
    pub fn effective_bounds(&self) -> (u32, u32) {
        let max = self.max_connections.max(1);
        (self.min_connections.min(max), max)
    }

    fn pg_options(&self) -> PgPoolOptions {
        let (min, max) = self.effective_bounds();
        PgPoolOptions::new()
            .max_connections(max)
            .min_connections(min)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
    }
}

/// Connect with [`PoolConfig::default`].
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Connect and open the configured minimum of connections.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let (min, max) = config.effective_bounds();
    if min != config.min_connections || max != config.max_connections {
        warn!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "pool",
            requested_min = config.min_connections,
            requested_max = config.max_connections,
            min_connections = min,
            max_connections = max,
            "Adjusted pool bounds"
        );
    }

    let start = Instant::now();
    let pool = config
        .pg_options()
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        { logging::SUBSYSTEM } = "db",
        { logging::COMPONENT } = "pool",
        { logging::OPERATION } = "connect",
        min_connections = min,
        max_connections = max,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        { logging::DURATION_MS } = start.elapsed().as_millis() as u64,
        "Database pool ready"
    );
    Ok(pool)
}

/// Build a pool that connects on first use. Only a malformed URL fails.
pub fn create_lazy_pool(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    config
        .pg_options()
        .connect_lazy(database_url)
        .map_err(Error::Database)
}

/// Report pool occupancy; warns when every open connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let open = pool.size();
    let idle = pool.num_idle();
    debug!(
        { logging::SUBSYSTEM } = "db",
        { logging::COMPONENT } = "pool",
        pool_size = open,
        pool_idle = idle,
        "Pool occupancy"
    );
    if open > 0 && idle == 0 {
        warn!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "pool",
            pool_size = open,
            "No idle connections, requests will queue"
        );
    }
}
