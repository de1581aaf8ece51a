//! Error types for the analyzer

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the analyzer
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Operator input errors
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Profile cache errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Upstream errors
    #[error("HTTP error: {0}")]
    Http(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Check if this error was caused by operator input rather than a fault
    pub fn is_operator_error(&self) -> bool {
        matches!(self, Error::InvalidAddress(_))
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
