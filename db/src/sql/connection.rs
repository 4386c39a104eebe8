//! Lazily created, resettable connection pool.
//!
//! The pool moves through three states: `Unconnected` until first use,
//! `Connected` while healthy, and `Failed` after any operation error. A failed
//! pool is closed immediately and rebuilt on the next request, so one bad
//! connection never poisons the process.

use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use tokio::sync::Mutex;

use super::config::DbConfig;
use crate::error::{Result, StoreError};

/// Observable state of a [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
    Failed,
}

enum PoolState {
    Unconnected,
    Connected(PgPool),
    Failed,
}

impl PoolState {
    fn observe(&self) -> ConnectionState {
        match self {
            PoolState::Unconnected => ConnectionState::Unconnected,
            PoolState::Connected(_) => ConnectionState::Connected,
            PoolState::Failed => ConnectionState::Failed,
        }
    }
}

pub struct ConnectionManager {
    config: DbConfig<'static>,
    state: Mutex<PoolState>,
}

impl ConnectionManager {
    pub fn new(config: DbConfig<'static>) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState::Unconnected),
        }
    }

    pub fn config(&self) -> &DbConfig<'static> {
        &self.config
    }

    pub async fn state(&self) -> ConnectionState {
        self.state.lock().await.observe()
    }

    /// The shared pool, connecting first if there is none
    pub async fn pool(&self) -> Result<PgPool> {
        let mut state = self.state.lock().await;
        if let PoolState::Connected(pool) = &*state {
            return Ok(pool.clone());
        }

        if matches!(*state, PoolState::Failed) {
            tracing::info!("Recreating database connection pool after failure...");
        } else {
            tracing::info!("Creating database connection pool for {}...", self.config.redacted_url());
        }

        let connected = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .min_connections(0)
            .idle_timeout(Duration::from_secs(30))
            .acquire_timeout(self.config.acquire_timeout)
            .connect_with(self.config.connect_options())
            .await;

        match connected {
            Ok(pool) => {
                tracing::info!("✓ Database connected successfully");
                *state = PoolState::Connected(pool.clone());
                Ok(pool)
            }
            Err(e) => {
                tracing::error!("✗ Failed to connect to database: {}", e);
                *state = PoolState::Failed;
                Err(StoreError::Unavailable(e.to_string()))
            }
        }
    }

    /// Check out one connection; it returns to the pool when dropped
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        let pool = self.pool().await?;
        match pool.acquire().await {
            Ok(conn) => Ok(conn),
            Err(e) => {
                self.reset().await;
                Err(e.into())
            }
        }
    }

    /// Tear down the pool after an error; the next call reconnects
    pub async fn reset(&self) {
        let previous = std::mem::replace(&mut *self.state.lock().await, PoolState::Failed);
        if let PoolState::Connected(pool) = previous {
            tracing::warn!("⚠ Resetting database connection pool");
            pool.close().await;
        }
    }

    /// Close the pool for shutdown
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.lock().await, PoolState::Unconnected);
        if let PoolState::Connected(pool) = previous {
            pool.close().await;
            tracing::info!("Database connection pool closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> DbConfig<'static> {
        // Port 1 on loopback refuses connections immediately
        DbConfig::new("127.0.0.1", 1, "clinic", "postgres", "postgres")
            .with_encryption(false, true)
            .with_acquire_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_starts_unconnected() {
        let manager = ConnectionManager::new(unreachable_config());
        assert_eq!(manager.state().await, ConnectionState::Unconnected);
    }

    #[tokio::test]
    async fn test_failed_connect_marks_failed_and_retries() {
        let manager = ConnectionManager::new(unreachable_config());

        let err = manager.acquire().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(manager.state().await, ConnectionState::Failed);

        // A second attempt goes through the reconnect path rather than a cached pool
        assert!(manager.pool().await.is_err());
        assert_eq!(manager.state().await, ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_close_returns_to_unconnected() {
        let manager = ConnectionManager::new(unreachable_config());
        let _ = manager.pool().await;
        manager.close().await;
        assert_eq!(manager.state().await, ConnectionState::Unconnected);
    }
}
