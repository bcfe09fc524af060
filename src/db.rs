//! Connection pool, migrations and backend selection.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use crate::config::Config;
use crate::store::{MemoryStore, PgStore, Store};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Open the configured backing store: PostgreSQL when `DATABASE_URL` is
/// set, otherwise an in-memory store.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.max_connections).await?;
            migrate(&pool).await?;
            info!(max_connections = config.max_connections, "connected to postgres");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, polls are kept in memory and lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
