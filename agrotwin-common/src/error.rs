//! Shared error type
//!
//! Storage, configuration and input failures raised below the service
//! layer. Services wrap these in their own typed errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query, pool or migration failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the data folder or reading a config file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML or an out-of-range setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// A date or parameter that cannot be queried
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
