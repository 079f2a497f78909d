//! Account management commands.

use stockroom_core::Role;
use stockroom_server::services::storage::FileStorage;
use stockroom_server::services::users::{NewAccount, UserService};

use super::connect;

/// Create an account with the given role.
///
/// # Errors
///
/// Returns an error for an unknown role, an invalid email or password, a
/// duplicate email, or a database failure.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let role: Role = role.parse()?;
    let pool = connect().await?;

    // Account creation never touches uploaded files
    let storage = FileStorage::new("uploads");
    let user = UserService::new(&pool, &storage)
        .create(NewAccount {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            role,
            phone: None,
            address: None,
        })
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
