//! Failure taxonomy of the session layer.
//!
//! Variants keep the precise internal reason so it can be logged; the HTTP
//! layer (`crate::error::AppError`) collapses them into generic client
//! messages.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown user")]
    UnknownUser,
    #[error("wrong password")]
    WrongPassword,
    #[error("username already taken")]
    UsernameTaken,
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid signing method")]
    InvalidSigningMethod,
    #[error("token signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
    #[error("unauthorized")]
    Unauthorized,
    #[error("missing authorization header")]
    MissingHeader,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("missing refresh cookie")]
    MissingCookie,
    /// No live session exists for the token id.
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("account directory unavailable: {0}")]
    AccountDirectoryUnavailable(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<redis::RedisError> for SessionError {
    fn from(error: redis::RedisError) -> Self {
        SessionError::StoreUnavailable(error.to_string())
    }
}
