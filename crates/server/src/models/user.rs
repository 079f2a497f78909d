//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockroom_core::{Email, Role, ThemePreference, UserId};

/// An account of any role.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub enabled: bool,
    pub theme_preference: ThemePreference,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn settings(&self) -> UserSettings {
        UserSettings {
            theme_preference: self.theme_preference,
            email_notifications: self.email_notifications,
            push_notifications: self.push_notifications,
        }
    }
}

/// Per-user display and notification preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub theme_preference: ThemePreference,
    pub email_notifications: bool,
    pub push_notifications: bool,
}
