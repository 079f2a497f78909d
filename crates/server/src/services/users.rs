//! Account administration and self-service profile management.

use sqlx::PgPool;
use thiserror::Error;

use stockroom_core::{Email, EmailError, Page, PageRequest, Role, ThemePreference, UserId};

use crate::db::users::{NewUser, UserChanges};
use crate::db::{RepositoryError, UserRepository};
use crate::models::User;
use crate::services::auth::password::PasswordError;
use crate::services::auth::{hash_password, validate_password, verify_password};
use crate::services::catalog::Upload;
use crate::services::storage::{FileStorage, StorageError};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,

    #[error("email is already in use")]
    EmailTaken,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    WeakPassword(String),

    #[error("current password is incorrect")]
    WrongPassword,

    #[error("you cannot delete your own account")]
    SelfDeletion,

    #[error("user has orders and cannot be deleted")]
    HasOrders,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

impl From<PasswordError> for UserError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => Self::WeakPassword(err.to_string()),
            PasswordError::Hash => Self::PasswordHash,
        }
    }
}

fn update_error(err: RepositoryError) -> UserError {
    match err {
        RepositoryError::NotFound => UserError::NotFound,
        RepositoryError::Conflict(_) => UserError::EmailTaken,
        other => UserError::Repository(other),
    }
}

/// An account created by an administrator.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Administrator edits to an account; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsUpdate {
    pub theme_preference: Option<ThemePreference>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

fn non_blank(value: Option<&str>, field: &str) -> Result<(), UserError> {
    if value.is_some_and(|v| v.trim().is_empty()) {
        return Err(UserError::Validation(format!("{field} cannot be blank")));
    }
    Ok(())
}

pub struct UserService<'a> {
    users: UserRepository<'a>,
    storage: &'a FileStorage,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, storage: &'a FileStorage) -> Self {
        Self {
            users: UserRepository::new(pool),
            storage,
        }
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// # Errors
    ///
    /// Returns `UserError::Repository` if the query fails.
    pub async fn search(
        &self,
        role: Option<Role>,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<User>, UserError> {
        let (users, total) = self.users.search(role, keyword, page).await?;
        Ok(Page::new(users, page, total))
    }

    /// # Errors
    ///
    /// Returns `UserError::NotFound` if the user doesn't exist.
    pub async fn get(&self, id: UserId) -> Result<User, UserError> {
        self.users.get_by_id(id).await?.ok_or(UserError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `UserError::Repository` if the query fails.
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>, UserError> {
        Ok(self.users.list_by_role(role).await?)
    }

    /// # Errors
    ///
    /// Returns `UserError::Validation`, `InvalidEmail`, `WeakPassword`, or
    /// `EmailTaken`.
    pub async fn create(&self, account: NewAccount) -> Result<User, UserError> {
        non_blank(Some(&account.name), "name")?;
        let email = Email::parse(&account.email)?;
        validate_password(&account.password)?;
        let password_hash = hash_password(&account.password)?;

        let user = self
            .users
            .create(NewUser {
                name: account.name.trim(),
                email: &email,
                password_hash: &password_hash,
                role: account.role,
                phone: account.phone.as_deref(),
                address: account.address.as_deref(),
            })
            .await
            .map_err(update_error)?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `UserError::NotFound`, `EmailTaken`, `InvalidEmail`,
    /// `WeakPassword`, or `Validation`.
    pub async fn update(&self, id: UserId, update: AccountUpdate) -> Result<User, UserError> {
        non_blank(update.name.as_deref(), "name")?;
        let email = update.email.as_deref().map(Email::parse).transpose()?;
        let password_hash = match update.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let user = self
            .users
            .update(
                id,
                UserChanges {
                    name: update.name.as_deref().map(str::trim),
                    email: email.as_ref(),
                    phone: update.phone.as_deref(),
                    address: update.address.as_deref(),
                    role: update.role,
                    enabled: update.enabled,
                    password_hash: password_hash.as_deref(),
                },
            )
            .await
            .map_err(update_error)?;

        tracing::info!(user_id = %id, "User updated");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `UserError::SelfDeletion`, `NotFound`, or `HasOrders`.
    pub async fn delete(&self, actor: UserId, id: UserId) -> Result<(), UserError> {
        if actor == id {
            return Err(UserError::SelfDeletion);
        }
        self.users.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound,
            RepositoryError::Conflict(_) => UserError::HasOrders,
            other => other.into(),
        })?;
        tracing::info!(user_id = %id, actor_id = %actor, "User deleted");
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Update the caller's own contact details.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmailTaken` if the new email belongs to someone else.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, UserError> {
        non_blank(update.name.as_deref(), "name")?;
        let email = update.email.as_deref().map(Email::parse).transpose()?;

        self.users
            .update(
                id,
                UserChanges {
                    name: update.name.as_deref().map(str::trim),
                    email: email.as_ref(),
                    phone: update.phone.as_deref(),
                    address: update.address.as_deref(),
                    ..UserChanges::default()
                },
            )
            .await
            .map_err(update_error)
    }

    /// # Errors
    ///
    /// Returns `UserError::WrongPassword` if `current` doesn't verify, or
    /// `WeakPassword` for a too-short replacement.
    pub async fn change_password(
        &self,
        id: UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        let hash = self
            .users
            .get_password_hash_by_id(id)
            .await?
            .ok_or(UserError::NotFound)?;
        if !verify_password(current, &hash) {
            return Err(UserError::WrongPassword);
        }
        validate_password(new_password)?;
        let new_hash = hash_password(new_password)?;

        self.users
            .update(
                id,
                UserChanges {
                    password_hash: Some(&new_hash),
                    ..UserChanges::default()
                },
            )
            .await
            .map_err(update_error)?;
        tracing::info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `UserError::NotFound` if the user doesn't exist.
    pub async fn update_settings(
        &self,
        id: UserId,
        settings: SettingsUpdate,
    ) -> Result<User, UserError> {
        self.users
            .update_settings(
                id,
                settings.theme_preference,
                settings.email_notifications,
                settings.push_notifications,
            )
            .await
            .map_err(update_error)
    }

    /// # Errors
    ///
    /// Returns `UserError::Storage` for empty or unsupported uploads.
    pub async fn upload_avatar(&self, id: UserId, upload: Upload) -> Result<User, UserError> {
        let url = self
            .storage
            .save_avatar(id, upload.filename.as_deref(), &upload.bytes)
            .await?;
        self.users.set_avatar_url(id, &url).await.map_err(update_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_error_mapping() {
        assert!(matches!(
            UserError::from(PasswordError::TooShort),
            UserError::WeakPassword(_)
        ));
        assert!(matches!(
            UserError::from(PasswordError::Hash),
            UserError::PasswordHash
        ));
    }

    #[test]
    fn test_update_error_mapping() {
        assert!(matches!(
            update_error(RepositoryError::Conflict("email already exists".into())),
            UserError::EmailTaken
        ));
        assert!(matches!(update_error(RepositoryError::NotFound), UserError::NotFound));
    }

    #[test]
    fn test_non_blank() {
        assert!(non_blank(None, "name").is_ok());
        assert!(non_blank(Some("Ada"), "name").is_ok());
        assert!(matches!(
            non_blank(Some("   "), "name"),
            Err(UserError::Validation(msg)) if msg == "name cannot be blank"
        ));
    }
}
