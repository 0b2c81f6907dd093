use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::Config;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Builds the connection pool without connecting.
    ///
    /// Connections are opened on first use, so the service can start and
    /// serve predictions while the database is unreachable. Acquiring a
    /// connection waits at most `db_acquire_timeout`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .connect_lazy(&config.database_url)?;

        Ok(Self { pool })
    }

    /// Round-trips a trivial query to check the database is reachable.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
