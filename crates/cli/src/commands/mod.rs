//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use sqlx::PgPool;

use stockroom_server::config::{ConfigError, database_url_from_env};
use stockroom_server::db;

/// Connect using `STOCKROOM_DATABASE_URL` (or `DATABASE_URL`), honouring `.env`.
///
/// # Errors
///
/// Returns an error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let database_url = database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
