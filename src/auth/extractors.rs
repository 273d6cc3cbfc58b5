use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;

/// Extracts the authenticated subject (username) from request extensions.
///
/// This extractor is intended to be used on routes protected by `AuthMiddleware`,
/// which validates the bearer token and inserts the subject into the request
/// extensions. If nothing was inserted, the request is rejected as unauthorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn username(&self) -> &str {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => {
                log::error!(
                    "no authenticated user on {}; is AuthMiddleware applied?",
                    req.path()
                );
                let err = AppError::Unauthorized("unauthorized".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
