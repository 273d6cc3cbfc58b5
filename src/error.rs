//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used by the HTTP layer.
//! It centralizes how failures are presented to clients: every variant becomes a
//! JSON body in the `{status: "error", message, data}` envelope with a matching
//! status code.
//!
//! Client-caused failures carry a short, generic message. Server-side failures
//! (database, session store, hashing) are logged with their full detail and
//! answered with a fixed message, so internal state never leaks into a response.
//! `From` implementations for `SessionError`, `sqlx::Error` and
//! `validator::ValidationErrors` allow handlers to use the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::Value;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::SessionError;
use crate::response::Envelope;

/// Represents all possible errors that can occur while serving a request.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    Unauthorized(String),
    /// Malformed or otherwise invalid request (HTTP 400).
    BadRequest(String),
    /// The requested resource does not exist or is not visible to the caller (HTTP 404).
    NotFound(String),
    /// Unexpected server-side error (HTTP 500). The message is only logged.
    InternalServerError(String),
    /// Error from database operations (HTTP 500). The message is only logged.
    DatabaseError(String),
    /// A backing service (session store, account directory) could not be
    /// reached (HTTP 503). The message is only logged.
    ServiceUnavailable(String),
    /// Input validation failed (HTTP 422); the field errors are returned in `data`.
    ValidationError(Value),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            AppError::ValidationError(details) => write!(f, "Validation Error: {}", details),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Unauthorized(msg) | AppError::BadRequest(msg) | AppError::NotFound(msg) => {
                Envelope::error(msg.clone(), None)
            }
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                log::error!("{}", self);
                Envelope::error("internal server error", None)
            }
            AppError::ServiceUnavailable(_) => {
                log::error!("{}", self);
                Envelope::error("service unavailable", None)
            }
            AppError::ValidationError(details) => {
                Envelope::error("validation failed", Some(details.clone()))
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Collapses session failures into client-safe errors.
///
/// Expired, forged and unknown tokens all read "unauthorized" so the
/// response does not reveal which check failed.
impl From<SessionError> for AppError {
    fn from(error: SessionError) -> AppError {
        match error {
            SessionError::UnknownUser | SessionError::WrongPassword => {
                log::warn!("login rejected: {}", error);
                AppError::Unauthorized("invalid credentials".into())
            }
            SessionError::UsernameTaken => AppError::BadRequest("username already taken".into()),
            SessionError::MissingHeader => {
                AppError::Unauthorized("missing authorization header".into())
            }
            SessionError::MalformedHeader => {
                AppError::Unauthorized("malformed authorization header".into())
            }
            SessionError::MalformedToken
            | SessionError::InvalidSigningMethod
            | SessionError::SignatureMismatch
            | SessionError::Expired
            | SessionError::Unauthorized
            | SessionError::MissingCookie
            | SessionError::NotFound => AppError::Unauthorized("unauthorized".into()),
            SessionError::StoreUnavailable(_) | SessionError::AccountDirectoryUnavailable(_) => {
                AppError::ServiceUnavailable(error.to_string())
            }
            SessionError::Hashing(_) | SessionError::Signing(_) => {
                AppError::InternalServerError(error.to_string())
            }
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` maps to `AppError::NotFound`; everything else
/// becomes `AppError::DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`,
/// keeping the per-field details.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        let details = serde_json::to_value(&error).unwrap_or_else(|_| Value::String(error.to_string()));
        AppError::ValidationError(details)
    }
}
