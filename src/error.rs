//! Error types for the FitFi catalog core

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the catalog core
///
/// None of these escape a product lookup: the cache tiers log them and
/// degrade to a miss or an empty result. They surface from the stores
/// themselves, configuration loading and the CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A backing store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
