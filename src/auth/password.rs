use bcrypt::{hash, verify, DEFAULT_COST};

use crate::auth::error::SessionError;

/// One-way credential hashing.
///
/// Implementations hold no mutable state and are shared across request
/// workers.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, SessionError>;

    /// Fails with `SessionError::WrongPassword` when `plaintext` does not
    /// match `hashed`.
    fn verify(&self, hashed: &str, plaintext: &str) -> Result<(), SessionError>;
}

/// Salted bcrypt hashing with a configurable cost factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, SessionError> {
        hash(plaintext, self.cost)
            .map_err(|e| SessionError::Hashing(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, hashed: &str, plaintext: &str) -> Result<(), SessionError> {
        match verify(plaintext, hashed) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SessionError::WrongPassword),
            Err(e) => Err(SessionError::Hashing(format!(
                "Failed to verify password: {}",
                e
            ))),
        }
    }
}
