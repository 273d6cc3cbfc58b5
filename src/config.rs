use std::env;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

use crate::auth::store::DEFAULT_MAX_SESSIONS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ")]
    SharedSecret,
}

/// Process configuration, read once at startup and handed to every
/// component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// `None` selects the in-process session store.
    pub redis_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// Domain the refresh cookie is scoped to.
    pub domain: String,
    pub cookie_secure: bool,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub refresh_token_max_age: StdDuration,
    pub max_sessions_per_user: usize,
    pub bcrypt_cost: u32,
    pub store_timeout: StdDuration,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    optional(name).map_or(Ok(default), |value| parse(name, value))
}

/// Upper bound for every configured lifetime: ten years.
pub const MAX_LIFETIME_MINUTES: i64 = 10 * 365 * 24 * 60;

fn minutes(name: &'static str, value: i64) -> Result<i64, ConfigError> {
    if value <= 0 || value > MAX_LIFETIME_MINUTES {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// Lifetimes are given in minutes. Secrets and the cookie domain have no
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token_secret = required("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required("REFRESH_TOKEN_SECRET")?;
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::SharedSecret);
        }

        let access_minutes = minutes(
            "ACCESS_TOKEN_EXPIRES_IN",
            parse("ACCESS_TOKEN_EXPIRES_IN", required("ACCESS_TOKEN_EXPIRES_IN")?)?,
        )?;
        let refresh_minutes = minutes(
            "REFRESH_TOKEN_EXPIRES_IN",
            parse("REFRESH_TOKEN_EXPIRES_IN", required("REFRESH_TOKEN_EXPIRES_IN")?)?,
        )?;
        let max_age_minutes = minutes(
            "REFRESH_TOKEN_MAX_AGE",
            parse_or("REFRESH_TOKEN_MAX_AGE", refresh_minutes)?,
        )?;

        let max_sessions_per_user: usize =
            parse_or("MAX_SESSIONS_PER_USER", DEFAULT_MAX_SESSIONS)?;
        if max_sessions_per_user == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_SESSIONS_PER_USER",
                value: "0".into(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: optional("REDIS_URL"),
            server_port: parse_or("SERVER_PORT", 8080)?,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            domain: required("APP_DOMAIN")?,
            cookie_secure: parse_or("COOKIE_SECURE", true)?,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl: Duration::minutes(access_minutes),
            refresh_token_ttl: Duration::minutes(refresh_minutes),
            refresh_token_max_age: StdDuration::from_secs(max_age_minutes as u64 * 60),
            max_sessions_per_user,
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            store_timeout: StdDuration::from_millis(parse_or("STORE_TIMEOUT_MS", 2000)?),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use std::sync::Mutex;

    lazy_static! {
        static ref ENV_LOCK: Mutex<()> = Mutex::new(());
    }

    const VARS: &[&str] = &[
        "DATABASE_URL",
        "REDIS_URL",
        "SERVER_PORT",
        "SERVER_HOST",
        "APP_DOMAIN",
        "COOKIE_SECURE",
        "ACCESS_TOKEN_SECRET",
        "REFRESH_TOKEN_SECRET",
        "ACCESS_TOKEN_EXPIRES_IN",
        "REFRESH_TOKEN_EXPIRES_IN",
        "REFRESH_TOKEN_MAX_AGE",
        "MAX_SESSIONS_PER_USER",
        "BCRYPT_COST",
        "STORE_TIMEOUT_MS",
    ];

    // Runs `test_logic` with exactly `vars` set among the known variables.
    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], test_logic: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for name in VARS {
            env::remove_var(name);
        }
        for (name, value) in vars {
            env::set_var(name, value);
        }
        test_logic();
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://test"),
        ("APP_DOMAIN", "example.com"),
        ("ACCESS_TOKEN_SECRET", "access-secret"),
        ("REFRESH_TOKEN_SECRET", "refresh-secret"),
        ("ACCESS_TOKEN_EXPIRES_IN", "15"),
        ("REFRESH_TOKEN_EXPIRES_IN", "1440"),
    ];

    #[test]
    fn test_config_from_env() {
        with_env(BASE, || {
            let config = Config::from_env().unwrap();

            assert_eq!(config.database_url, "postgres://test");
            assert_eq!(config.server_port, 8080);
            assert_eq!(config.server_host, "127.0.0.1");
            assert_eq!(config.redis_url, None);
            assert_eq!(config.access_token_ttl, Duration::minutes(15));
            assert_eq!(config.refresh_token_ttl, Duration::minutes(1440));
            assert_eq!(config.refresh_token_max_age, StdDuration::from_secs(1440 * 60));
            assert_eq!(config.max_sessions_per_user, 5);
            assert!(config.cookie_secure);
            assert_eq!(config.server_url(), "http://127.0.0.1:8080");
        });

        let mut custom = BASE.to_vec();
        custom.extend_from_slice(&[
            ("SERVER_PORT", "3000"),
            ("SERVER_HOST", "0.0.0.0"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("REFRESH_TOKEN_MAX_AGE", "60"),
            ("COOKIE_SECURE", "false"),
        ]);
        with_env(&custom, || {
            let config = Config::from_env().unwrap();

            assert_eq!(config.server_port, 3000);
            assert_eq!(config.server_host, "0.0.0.0");
            assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
            assert_eq!(config.refresh_token_max_age, StdDuration::from_secs(3600));
            assert!(!config.cookie_secure);
        });
    }

    #[test]
    fn test_secrets_are_required_and_distinct() {
        let without_secret: Vec<_> = BASE
            .iter()
            .copied()
            .filter(|(name, _)| *name != "REFRESH_TOKEN_SECRET")
            .collect();
        with_env(&without_secret, || {
            assert_eq!(
                Config::from_env().unwrap_err(),
                ConfigError::Missing("REFRESH_TOKEN_SECRET")
            );
        });

        let mut shared = BASE.to_vec();
        shared.push(("REFRESH_TOKEN_SECRET", "access-secret"));
        with_env(&shared, || {
            assert_eq!(Config::from_env().unwrap_err(), ConfigError::SharedSecret);
        });
    }

    #[test]
    fn test_invalid_lifetimes_are_rejected() {
        let mut bad = BASE.to_vec();
        bad.push(("ACCESS_TOKEN_EXPIRES_IN", "soon"));
        with_env(&bad, || {
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::Invalid {
                    name: "ACCESS_TOKEN_EXPIRES_IN",
                    ..
                })
            ));
        });

        let mut zero = BASE.to_vec();
        zero.push(("ACCESS_TOKEN_EXPIRES_IN", "0"));
        with_env(&zero, || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn test_oversized_lifetimes_are_rejected() {
        for name in [
            "ACCESS_TOKEN_EXPIRES_IN",
            "REFRESH_TOKEN_EXPIRES_IN",
            "REFRESH_TOKEN_MAX_AGE",
        ] {
            let mut huge = BASE.to_vec();
            huge.push((name, "9223372036854775807"));
            with_env(&huge, || {
                assert_eq!(
                    Config::from_env().unwrap_err(),
                    ConfigError::Invalid {
                        name,
                        value: "9223372036854775807".into()
                    }
                );
            });
        }

        let mut longest = BASE.to_vec();
        let max = MAX_LIFETIME_MINUTES.to_string();
        longest.push(("REFRESH_TOKEN_EXPIRES_IN", max.as_str()));
        with_env(&longest, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.refresh_token_ttl, Duration::minutes(MAX_LIFETIME_MINUTES));
        });
    }
}
