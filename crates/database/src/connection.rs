use crate::error::DbError;
use configuration::DatabaseConfig;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// The URL comes from the configuration when set, otherwise from `DATABASE_URL`
/// (a `.env` file is honoured).
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    dotenvy::dotenv().ok();

    let database_url = match &config.url {
        Some(url) => url.clone(),
        None => env::var("DATABASE_URL")
            .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?,
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations so the schema is current before any query runs.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
