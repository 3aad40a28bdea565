//! Error types for the classwatch server
//!
//! One crate-wide error enum with category helpers, shared by the storage
//! layer, the ingestion pipeline and the HTTP surface.

use thiserror::Error;

/// Result type alias for classwatch operations
pub type Result<T> = std::result::Result<T, ClasswatchError>;

/// Error categories for classwatch operations
#[derive(Error, Debug)]
pub enum ClasswatchError {
    /// Sensor channel errors (open, read, bind)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid client input (registration, simulation requests)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl ClasswatchError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a database error
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}
