use actix_web::cookie::{time::Duration, Cookie};

use crate::config::Config;

/// Name of the cookie carrying the refresh session id.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Attributes shared by every refresh cookie the server sets.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub domain: String,
    pub secure: bool,
    pub max_age: std::time::Duration,
}

impl CookiePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            domain: config.domain.clone(),
            secure: config.cookie_secure,
            max_age: config.refresh_token_max_age,
        }
    }

    pub fn issue(&self, token_id: &str) -> Cookie<'static> {
        refresh_cookie(token_id, &self.domain, self.secure, self.max_age)
    }

    pub fn clear(&self) -> Cookie<'static> {
        clear_refresh_cookie(&self.domain, self.secure)
    }
}

/// Build the refresh cookie for a newly opened session.
pub fn refresh_cookie(
    token_id: &str,
    domain: &str,
    secure: bool,
    max_age: std::time::Duration,
) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token_id.to_owned())
        .domain(domain.to_owned())
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::seconds(max_age.as_secs() as i64))
        .finish()
}

/// Build an already-expired, empty refresh cookie.
pub fn clear_refresh_cookie(domain: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, String::new())
        .domain(domain.to_owned())
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::seconds(-1))
        .finish()
}
