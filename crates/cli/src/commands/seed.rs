//! Seed the default administrator.

use stockroom_server::config::SeedAdminConfig;
use stockroom_server::seed::{SeedOutcome, ensure_admin};

use super::connect;

/// Create the administrator configured by `SEED_ADMIN_EMAIL`,
/// `SEED_ADMIN_PASSWORD`, and `SEED_ADMIN_NAME`.
///
/// # Errors
///
/// Returns an error if the variables are missing, the connection fails, or
/// the account cannot be created.
pub async fn admin() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let seed = SeedAdminConfig::from_env()
        .ok_or("SEED_ADMIN_EMAIL and SEED_ADMIN_PASSWORD must be set")?;

    let pool = connect().await?;

    match ensure_admin(&pool, &seed).await? {
        SeedOutcome::Created(id) => {
            tracing::info!("Administrator created! ID: {}, Email: {}", id, seed.email);
        }
        SeedOutcome::AlreadyExists => {
            tracing::info!("An account already uses {}; nothing to do", seed.email);
        }
    }
    Ok(())
}
