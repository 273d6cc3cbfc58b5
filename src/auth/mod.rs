pub mod cookies;
pub mod directory;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod redis_store;
pub mod session;
pub mod store;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// Re-export necessary items
pub use cookies::{CookiePolicy, REFRESH_COOKIE};
pub use directory::{AccountDirectory, MemoryAccountDirectory, PgAccountDirectory};
pub use error::SessionError;
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{BcryptHasher, PasswordHasher};
pub use redis_store::RedisSessionStore;
pub use session::{LoginOutcome, SessionService, SessionSettings};
pub use store::{MemorySessionStore, SessionStore};
pub use token::{Claims, IssuedToken, TokenSigner};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Must be between 3 and 32 characters, alphanumeric, and can include underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Password for the new account.
    /// Must be at least 6 characters long and at most 72 bytes once UTF-8 encoded.
    #[validate(length(min = 6), custom = "validate_password_bytes")]
    pub password: String,
}

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut error = ValidationError::new("password_too_long");
        let message = format!("Password must be at most {} bytes", MAX_PASSWORD_BYTES);
        error.message = Some(message.into());
        return Err(error);
    }
    Ok(())
}

/// Body returned by a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// The refresh session id, identical to the refresh cookie value.
    pub refresh_token: String,
}

/// Body returned by a successful refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}
