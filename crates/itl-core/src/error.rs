//! Error types for the ITL mismatch detector
//!
//! Probe failures are never represented here: an unreachable phone is a
//! verdict, not an error. These variants cover the surrounding stages.

use thiserror::Error;

/// Result type alias for detector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the detector
#[derive(Error, Debug)]
pub enum Error {
    /// Directory resolution errors (AXL/RIS or custom resolvers)
    #[error("Directory error: {0}")]
    Directory(String),

    /// Prober construction errors
    #[error("Prober error: {0}")]
    Prober(String),

    /// Report sink errors
    #[error("Report error: {0}")]
    Report(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed XML in an API response
    #[error("XML error: {0}")]
    Xml(String),

    /// HTTP client errors (from the cluster APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Caller contract violation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The cluster failed the connectivity check (unreachable, timed out
    /// or rejected the credentials)
    #[error("Connectivity check failed: {0}")]
    Connectivity(String),
}

impl Error {
    /// Create a directory error
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    /// Create a prober error
    pub fn prober(msg: impl Into<String>) -> Self {
        Self::Prober(msg.into())
    }

    /// Create a report error
    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an XML error
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a connectivity check error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }
}
