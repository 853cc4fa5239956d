use std::time::Duration;
use thiserror::Error;

/// Main error type for kgcrawl
#[derive(Error, Debug)]
pub enum KgcrawlError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport errors talking to the query endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Endpoint answered, but not with something we understand
    #[error("Query error: {0}")]
    Query(String),

    /// A describe call ran past its time box
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Durable cache document problems
    #[error("Cache error: {0}")]
    Cache(String),
}

/// Convenient Result type using KgcrawlError
pub type Result<T> = std::result::Result<T, KgcrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KgcrawlError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KgcrawlError = io_err.into();
        assert!(matches!(err, KgcrawlError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: KgcrawlError = json_err.into();
        assert!(matches!(err, KgcrawlError::Json(_)));
    }

    #[test]
    fn test_timeout_display() {
        let err = KgcrawlError::Timeout(Duration::from_millis(2000));
        assert!(err.to_string().contains("2s"));
    }
}
