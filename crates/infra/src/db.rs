//! Connection pool and schema bootstrap.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Schema applied at startup. Every statement is idempotent.
pub const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Connect to Postgres and make sure the schema exists.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    apply_schema(&pool).await?;
    info!(max_connections, "postgres connected, schema applied");
    Ok(pool)
}

pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
