//! Error types for pawprint-core

use thiserror::Error;

/// Main error type for the pawprint-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Device store error
    #[error("device store error: {0}")]
    Storage(String),

    /// Analytics client/API error
    #[error("analytics client error: {0}")]
    Client(String),
}

/// Result type alias for pawprint-core
pub type Result<T> = std::result::Result<T, Error>;
