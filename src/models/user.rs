use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A registered account as stored in the `users` table.
///
/// Carries the password hash, so it is never serialized to clients; use
/// `AccountSummary` for responses.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            avatar: account.avatar.clone(),
            created_at: account.created_at,
        }
    }
}

/// Partial update of the profile fields. Absent fields keep their value;
/// an empty string clears one.
///
/// The username is the subject of every issued token and cannot be changed.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    #[validate(length(max = 512))]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    /// Applies the present fields to `account`.
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(first_name) = &self.first_name {
            account.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            account.last_name = last_name.clone();
        }
        if let Some(avatar) = &self.avatar {
            account.avatar = avatar.clone();
        }
    }
}
