//! # souk-db
//!
//! Database layer for Souk.
//! - **sqlx `AnyPool`**: PostgreSQL in production, SQLite for lite mode and tests
//! - **Redis** (optional): presence cache shared between API and gateway nodes

pub mod any_compat;
pub mod presence;
pub mod repository;

use std::time::Duration;

use anyhow::Result;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

/// Shared database state passed through Axum state.
#[derive(Clone)]
pub struct Database {
    pub pool: AnyPool,
    pub redis: Option<redis::aio::ConnectionManager>,
}

impl Database {
    /// Connect using the application configuration.
    pub async fn connect(config: &souk_common::config::AppConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        tracing::info!(url = %redact(&config.database.url), "Connecting to database...");
        let pool = AnyPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.database.url)
            .await?;
        tracing::info!("Connected to database");

        let redis = match config.redis.url.as_deref() {
            Some(url) if !url.is_empty() => {
                tracing::info!("Connecting to Redis...");
                let client = redis::Client::open(url)?;
                let manager = redis::aio::ConnectionManager::new(client).await?;
                tracing::info!("Connected to Redis");
                Some(manager)
            }
            _ => {
                tracing::info!("No Redis configured; presence is kept in process");
                None
            }
        };

        Ok(Self { pool, redis })
    }

    /// Single-connection pool without Redis. `sqlite::memory:` databases live
    /// as long as their connection, so the connection is never recycled.
    pub async fn connect_url(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        Ok(Self { pool, redis: None })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Health check: verify the database is reachable.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Strip credentials from a connection URL before logging it.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact("postgres://souk:secret@db:5432/souk"),
            "postgres://***@db:5432/souk"
        );
        assert_eq!(redact("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn migrates_in_memory_sqlite() {
        let db = Database::connect_url("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        assert!(db.health_check().await);
    }
}
