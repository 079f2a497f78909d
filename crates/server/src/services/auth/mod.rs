//! Authentication service.
//!
//! Password login and registration, plus the emailed one-time code flow for
//! resetting a forgotten password.

mod error;
pub mod password;

pub use error::AuthError;
pub use password::{MIN_PASSWORD_LENGTH, hash_password, validate_password, verify_password};

use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;

use stockroom_core::{Email, OTP_TTL_MINUTES, OtpCode, Role, UserId};

use crate::db::users::NewUser;
use crate::db::{OtpRepository, RepositoryError, UserRepository};
use crate::models::User;
use crate::services::email::{EmailService, Notice};

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    otps: OtpRepository<'a>,
    email: &'a EmailService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self {
            users: UserRepository::new(pool),
            otps: OtpRepository::new(pool),
            email,
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(NewUser {
                name: name.trim(),
                email: &email,
                password_hash: &password_hash,
                role: Role::Customer,
                phone: None,
                address: None,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Customer registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if the account is disabled.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.enabled {
            return Err(AuthError::AccountDisabled);
        }

        Ok(user)
    }

    /// Issue a reset code for `email` and mail it.
    ///
    /// Earlier codes for the address are discarded.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account uses the email.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        if !self.users.email_exists(&email).await? {
            return Err(AuthError::UserNotFound);
        }

        let code = generate_otp();
        let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
        self.otps.replace(&email, &code, expires_at).await?;

        self.email.dispatch(&email, &Notice::Otp { code: &code });
        tracing::info!(email = %email, "Password reset code issued");
        Ok(())
    }

    /// Whether `otp` is a live code for `email`. Malformed codes are simply invalid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address.
    pub async fn validate_otp(&self, email: &str, otp: &str) -> Result<bool, AuthError> {
        let email = Email::parse(email)?;
        let Ok(code) = OtpCode::parse(otp) else {
            return Ok(false);
        };
        Ok(self.otps.is_valid(&email, &code).await?)
    }

    /// Consume a reset code and set a new password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` before touching the code if the new
    /// password is too short, `AuthError::InvalidOtp` if no live code matched,
    /// and `AuthError::UserNotFound` if the account disappeared meanwhile.
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let code = OtpCode::parse(otp)?;
        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        if !self.otps.consume(&email, &code).await? {
            return Err(AuthError::InvalidOtp);
        }

        self.users
            .set_password_by_email(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(email = %email, "Password reset");
        Ok(())
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Generate a six digit, zero padded reset code.
#[must_use]
pub fn generate_otp() -> OtpCode {
    OtpCode::from_number(rand::rng().random_range(0..OtpCode::MODULUS))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.as_str().len(), 6);
            assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
            assert!(OtpCode::parse(code.as_str()).is_ok());
        }
    }

    #[test]
    fn test_password_error_maps_to_auth_error() {
        let err: AuthError = validate_password("short").unwrap_err().into();
        assert!(matches!(err, AuthError::WeakPassword(msg) if msg.contains('8')));
    }
}
