//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! cookie is signed with a key derived from `STOCKROOM_SESSION_SECRET`.

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ServerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "stockroom_session";

/// Sessions expire after a day of inactivity.
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

const KEY_SALT: &[u8] = b"stockroom-session-cookie";

/// Stretch the configured secret into the 64 bytes cookie signing needs.
///
/// # Panics
///
/// This function will not panic. The parameters, salt, and output length
/// are constants within Argon2's limits.
#[must_use]
pub fn session_key(secret: &SecretString) -> Key {
    let params = Params::new(8 * 1024, 1, 1, Some(64)).expect("constant Argon2 params are valid");
    let mut bytes = [0u8; 64];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(secret.expose_secret().as_bytes(), KEY_SALT, &mut bytes)
        .expect("64-byte output with a constant salt is valid");
    Key::from(&bytes[..])
}

/// Create the session layer with the `PostgreSQL` store.
///
/// The `shop.session` table is created by the migrations, so the store's own
/// `migrate()` is never called.
///
/// # Panics
///
/// This function will not panic. The schema and table names are constant
/// lowercase identifiers, which the store always accepts.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &ServerConfig,
    key: Key,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("shop")
        .expect("\"shop\" is a valid schema name")
        .with_table_name("session")
        .expect("\"session\" is a valid table name");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_deterministic_per_secret() {
        let a = SecretString::from("k3Jx9Qm2Vt7Lp4Wz8Rn6Yb1Hc5Fd0Gs3");
        let b = SecretString::from("Zq8Wn3Lx5Tb7Vk2Rm9Pc4Hy6Jd1Fs0Ga");
        assert_eq!(session_key(&a).master(), session_key(&a).master());
        assert_ne!(session_key(&a).master(), session_key(&b).master());
    }
}
