//! Account lookup, creation and profile maintenance used by the session layer.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::auth::error::SessionError;
use crate::models::{Account, ProfileUpdate};

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, SessionError>;

    /// Creates an account; fails with `SessionError::UsernameTaken` when the
    /// username is already registered.
    async fn create(&self, username: &str, password_hash: &str) -> Result<Account, SessionError>;

    /// Applies `update` and returns the stored account, or `None` when no
    /// account has that username.
    async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Account>, SessionError>;

    /// Removes the account. Returns `false` when there was nothing to remove.
    async fn delete(&self, username: &str) -> Result<bool, SessionError>;
}

const ACCOUNT_COLUMNS: &str = "id, username, password_hash, first_name, last_name, avatar, created_at";

/// Accounts stored in the Postgres `users` table.
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn directory_error(error: sqlx::Error) -> SessionError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => SessionError::UsernameTaken,
        _ => SessionError::AccountDirectoryUnavailable(error.to_string()),
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, SessionError> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(directory_error)
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<Account, SessionError> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(directory_error)
    }

    async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Account>, SessionError> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE users SET first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), avatar = COALESCE($4, avatar) \
             WHERE username = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.avatar)
        .fetch_optional(&self.pool)
        .await
        .map_err(directory_error)
    }

    async fn delete(&self, username: &str) -> Result<bool, SessionError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(directory_error)?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-process account directory, used when no database is involved (tests,
/// local experiments).
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: Mutex<HashMap<String, Account>>,
    next_id: Mutex<i64>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> Result<MutexGuard<'_, HashMap<String, Account>>, SessionError> {
        self.accounts
            .lock()
            .map_err(|_| SessionError::AccountDirectoryUnavailable("lock poisoned".into()))
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, SessionError> {
        Ok(self.accounts()?.get(username).cloned())
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<Account, SessionError> {
        let mut accounts = self.accounts()?;
        if accounts.contains_key(username) {
            return Err(SessionError::UsernameTaken);
        }
        // Ids are never reused, even after a delete.
        let id = {
            let mut next_id = self
                .next_id
                .lock()
                .map_err(|_| SessionError::AccountDirectoryUnavailable("lock poisoned".into()))?;
            *next_id += 1;
            *next_id
        };
        let account = Account {
            id,
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            avatar: String::new(),
            created_at: Utc::now(),
        };
        accounts.insert(username.to_owned(), account.clone());
        Ok(account)
    }

    async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Account>, SessionError> {
        let mut accounts = self.accounts()?;
        Ok(accounts.get_mut(username).map(|account| {
            update.apply_to(account);
            account.clone()
        }))
    }

    async fn delete(&self, username: &str) -> Result<bool, SessionError> {
        Ok(self.accounts()?.remove(username).is_some())
    }
}
