//! Login, refresh and logout protocol.
//!
//! `SessionService` ties the account directory, the password hasher, the two
//! token signers and the refresh session store together. One instance is
//! built at startup and shared by every request worker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::auth::directory::AccountDirectory;
use crate::auth::error::SessionError;
use crate::auth::password::PasswordHasher;
use crate::auth::store::SessionStore;
use crate::auth::token::TokenSigner;
use crate::config::Config;
use crate::models::{Account, ProfileUpdate};

/// Authorization scheme prefix, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Lifetimes and deadlines used by the session protocol.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Lifetime of the stored session record and of the refresh cookie.
    pub refresh_max_age: StdDuration,
    /// Deadline applied to every store and directory call.
    pub store_timeout: StdDuration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            refresh_max_age: config.refresh_token_max_age,
            store_timeout: config.store_timeout,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub subject: String,
    pub access_token: String,
    /// Identifier of the stored refresh session; this is what the refresh
    /// cookie carries, never the signed refresh token itself.
    pub refresh_token_id: String,
}

pub struct SessionService {
    directory: Arc<dyn AccountDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    store: Arc<dyn SessionStore>,
    access_signer: TokenSigner,
    refresh_signer: TokenSigner,
    settings: SessionSettings,
}

impl SessionService {
    pub fn new(
        settings: SessionSettings,
        access_signer: TokenSigner,
        refresh_signer: TokenSigner,
        directory: Arc<dyn AccountDirectory>,
        hasher: Arc<dyn PasswordHasher>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            directory,
            hasher,
            store,
            access_signer,
            refresh_signer,
            settings,
        }
    }

    /// Builds the service with signers keyed from `config`.
    pub fn from_config(
        config: &Config,
        directory: Arc<dyn AccountDirectory>,
        hasher: Arc<dyn PasswordHasher>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::new(
            SessionSettings::from_config(config),
            TokenSigner::new(config.access_token_secret.as_bytes()),
            TokenSigner::new(config.refresh_token_secret.as_bytes()),
            directory,
            hasher,
            store,
        )
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Account, SessionError> {
        let password_hash = self.hash_password(password).await?;
        let account = self
            .directory_call(self.directory.create(username, &password_hash))
            .await?;
        log::info!("registered account {}", account.username);
        Ok(account)
    }

    /// Verifies credentials and opens a new refresh session.
    ///
    /// Other sessions of the same user stay valid until the per-user cap
    /// forces an eviction.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        let account = self
            .directory_call(self.directory.find_by_username(username))
            .await?
            .ok_or(SessionError::UnknownUser)?;
        self.verify_password(&account.password_hash, password).await?;

        let access = self
            .access_signer
            .create_token(self.settings.access_ttl, &account.username)?;
        let refresh = self
            .refresh_signer
            .create_token(self.settings.refresh_ttl, &account.username)?;

        self.store_call(self.store.put(
            &account.username,
            &refresh.token_id,
            &refresh.token,
            self.settings.refresh_max_age,
        ))
        .await?;

        log::info!("user {} logged in", account.username);
        Ok(LoginOutcome {
            subject: account.username,
            access_token: access.token,
            refresh_token_id: refresh.token_id,
        })
    }

    /// Issues a new access token for the session behind `token_id`.
    ///
    /// The refresh session itself is left untouched.
    pub async fn refresh(&self, token_id: Option<&str>) -> Result<String, SessionError> {
        let token_id = non_empty(token_id).ok_or(SessionError::MissingCookie)?;
        let stored = self.lookup_session(token_id).await?;

        let claims = self.refresh_signer.decode_claims(&stored).map_err(|e| {
            log::warn!("stored refresh token rejected: {}", e);
            SessionError::Unauthorized
        })?;
        if claims.jti != token_id {
            log::warn!("refresh session {} holds a token with another id", token_id);
            return Err(SessionError::Unauthorized);
        }

        let access = self
            .access_signer
            .create_token(self.settings.access_ttl, &claims.sub)?;
        log::debug!("issued access token for {}", claims.sub);
        Ok(access.token)
    }

    /// Revokes the session behind `token_id`.
    ///
    /// Unknown or already revoked ids are reported as `Unauthorized`, never as
    /// success.
    pub async fn logout(&self, token_id: Option<&str>) -> Result<(), SessionError> {
        let token_id = non_empty(token_id).ok_or(SessionError::MissingCookie)?;
        self.lookup_session(token_id).await?;

        let deleted = self.store_call(self.store.delete(token_id)).await?;
        if deleted == 0 {
            return Err(SessionError::Unauthorized);
        }
        Ok(())
    }

    /// Loads the account behind an authenticated subject.
    ///
    /// An access token can outlive its account; that case is `Unauthorized`.
    pub async fn profile(&self, username: &str) -> Result<Account, SessionError> {
        self.directory_call(self.directory.find_by_username(username))
            .await?
            .ok_or(SessionError::Unauthorized)
    }

    pub async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> Result<Account, SessionError> {
        let account = self
            .directory_call(self.directory.update_profile(username, update))
            .await?
            .ok_or(SessionError::Unauthorized)?;
        log::info!("updated profile of {}", account.username);
        Ok(account)
    }

    /// Deletes the account and revokes every refresh session it still holds.
    ///
    /// Access tokens already issued stay valid until they expire, but every
    /// route that needs the account then answers `Unauthorized`.
    pub async fn delete_account(&self, username: &str) -> Result<u64, SessionError> {
        if !self.directory_call(self.directory.delete(username)).await? {
            return Err(SessionError::Unauthorized);
        }
        let revoked = self.store_call(self.store.delete_subject(username)).await?;
        log::info!("deleted account {} and {} session(s)", username, revoked);
        Ok(revoked)
    }

    /// Resolves the subject of an `Authorization` header value.
    pub fn authenticate(&self, header: Option<&str>) -> Result<String, SessionError> {
        let token = bearer_token(header)?;
        self.access_signer.validate_token(token).map_err(|e| {
            log::debug!("access token rejected: {}", e);
            SessionError::Unauthorized
        })
    }

    // bcrypt is CPU-bound and runs on the blocking pool.
    async fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| SessionError::Hashing(format!("hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, hashed: &str, password: &str) -> Result<(), SessionError> {
        let hasher = Arc::clone(&self.hasher);
        let hashed = hashed.to_owned();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&hashed, &password))
            .await
            .map_err(|e| SessionError::Hashing(format!("verification task failed: {}", e)))?
    }

    async fn lookup_session(&self, token_id: &str) -> Result<String, SessionError> {
        match self.store_call(self.store.get(token_id)).await {
            Ok(token) => Ok(token),
            Err(SessionError::NotFound) => Err(SessionError::Unauthorized),
            Err(e) => Err(e),
        }
    }

    async fn store_call<T>(
        &self,
        call: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        tokio::time::timeout(self.settings.store_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(SessionError::StoreUnavailable(format!(
                    "no reply within {:?}",
                    self.settings.store_timeout
                )))
            })
    }

    async fn directory_call<T>(
        &self,
        call: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        tokio::time::timeout(self.settings.store_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(SessionError::AccountDirectoryUnavailable(format!(
                    "no reply within {:?}",
                    self.settings.store_timeout
                )))
            })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Extracts the token from a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, SessionError> {
    let header = header.ok_or(SessionError::MissingHeader)?;
    if header.is_empty() {
        return Err(SessionError::MissingHeader);
    }
    match header.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() && !token.contains(char::is_whitespace) => Ok(token),
        _ => Err(SessionError::MalformedHeader),
    }
}
