//! Error types for chatvault
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for chatvault operations
///
/// This enum encompasses all possible errors that can occur while
/// loading configuration, persisting conversation records, assembling
/// prompts, and calling the text-generation provider.
#[derive(Error, Debug)]
pub enum ChatvaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client-side input errors (missing message, empty title, bad id)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation on a session that does not exist where absence is not
    /// the defined default (title update, delete, clear)
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Record store errors (read/write/delete at the persistence layer,
    /// including malformed persisted documents)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Provider errors (the external generation call failed or timed out)
    #[error("Provider error: {0}")]
    Provider(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chatvault operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ChatvaultError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_validation_error_display() {
        let error = ChatvaultError::Validation("message is required".to_string());
        assert_eq!(error.to_string(), "Validation error: message is required");
    }

    #[test]
    fn test_not_found_error_display() {
        let error = ChatvaultError::NotFound("abc-123".to_string());
        assert_eq!(error.to_string(), "Session not found: abc-123");
    }

    #[test]
    fn test_storage_error_display() {
        let error = ChatvaultError::Storage("disk full".to_string());
        assert_eq!(error.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_provider_error_display() {
        let error = ChatvaultError::Provider("API timeout".to_string());
        assert_eq!(error.to_string(), "Provider error: API timeout");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatvaultError = io_error.into();
        assert!(matches!(error, ChatvaultError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: ChatvaultError = json_error.into();
        assert!(matches!(error, ChatvaultError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: ChatvaultError = yaml_error.into();
        assert!(matches!(error, ChatvaultError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatvaultError>();
    }
}
