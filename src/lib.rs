#![doc = "The `taskfolio` library crate."]
#![doc = ""]
#![doc = "Holds the session layer (token signing, refresh session storage, the"]
#![doc = "login/refresh/logout protocol, account maintenance), the account, folder"]
#![doc = "and item models, routing configuration and error handling. The binary"]
#![doc = "(`main.rs`) wires these together from the environment and runs the HTTP server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;

pub use crate::config::Config;
pub use crate::error::AppError;
