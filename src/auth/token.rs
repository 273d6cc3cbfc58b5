use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::SessionError;

/// Represents the claims encoded within a signed token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token, the account's username.
    pub sub: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique token identifier.
    pub jti: String,
}

/// A freshly signed token together with its raw identifier.
///
/// The identifier is returned separately because callers use it as a lookup
/// key without parsing the opaque token string.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: String,
}

/// Signs and validates HMAC tokens with a single key.
///
/// Access and refresh tokens each get their own `TokenSigner`, so a token
/// minted by one never validates against the other.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Any member of the HMAC family is accepted; everything else is
        // rejected before the signature is checked.
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Creates a token for `subject` that expires `ttl` from now.
    ///
    /// A fresh random v4 UUID (122 random bits) is used as the token id.
    pub fn create_token(&self, ttl: Duration, subject: &str) -> Result<IssuedToken, SessionError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| SessionError::Signing("token lifetime overflows".into()))?;
        let token_id = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: token_id.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken { token, token_id })
    }

    /// Verifies signature and expiry, returning the decoded claims.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
                    SessionError::InvalidSigningMethod
                }
                ErrorKind::InvalidSignature => SessionError::SignatureMismatch,
                _ => SessionError::MalformedToken,
            })
    }

    /// Validates `token` and returns its subject.
    pub fn validate_token(&self, token: &str) -> Result<String, SessionError> {
        self.decode_claims(token).map(|claims| claims.sub)
    }
}
