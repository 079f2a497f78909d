//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;
use tower_sessions::cookie::Key;

use crate::config::ServerConfig;
use crate::middleware::session::session_key;
use crate::services::email::EmailService;
use crate::services::storage::FileStorage;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    email: EmailService,
    storage: FileStorage,
    session_key: Key,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay configuration is invalid.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let email = EmailService::new(config.email.as_ref(), &config.base_url)?;
        if !email.is_enabled() {
            tracing::warn!("SMTP not configured, emails will be logged instead of sent");
        }
        let storage = FileStorage::new(config.upload_dir.clone());
        let session_key = session_key(&config.session_secret);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                storage,
                session_key,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Uploaded image storage.
    #[must_use]
    pub fn storage(&self) -> &FileStorage {
        &self.inner.storage
    }

    /// Signing key for session cookies.
    #[must_use]
    pub fn session_key(&self) -> &Key {
        &self.inner.session_key
    }
}
