//! Error types for the ironlog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ironlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A named program, block, exercise or session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to create something that already exists (e.g. a second active session)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation is not valid in the current session state
    #[error("State error: {0}")]
    State(String),

    /// A 1-based index was out of bounds
    #[error("Out of range: {0}")]
    Range(String),

    /// Malformed input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Durable store failure (transaction, query or commit)
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }

    pub(crate) fn no_active_session() -> Self {
        Error::State("no active session".into())
    }
}
