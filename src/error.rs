/// Error types for taskpulse
///
/// This module defines all possible errors that can occur in the engine.
/// Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Main error type for taskpulse operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bad regex pattern
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// History or activity log could not be fetched (failed, timed out)
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Malformed work item (missing id, unknown status, ...)
    #[error("Invalid work item: {0}")]
    InvalidItem(String),

    /// A cached entry failed validation
    #[error("Cache corruption: {0}")]
    CacheCorruption(String),

    /// Bad input to the recorder (empty title, negative estimate, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Work item not found in the store
    #[error("Work item not found: {0}")]
    WorkItemNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for taskpulse operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Convert to a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Database(e) => {
                format!("Database error occurred. Please try again. Details: {}", e)
            }
            EngineError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            EngineError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            EngineError::Pattern(e) => {
                format!("Internal pattern error: {}", e)
            }
            EngineError::DataUnavailable(msg) => {
                format!(
                    "Could not load your history ({}). Try again, or run 'taskpulse config set strict false'.",
                    msg
                )
            }
            EngineError::InvalidItem(reason) => {
                format!("Skipped a malformed task: {}", reason)
            }
            EngineError::CacheCorruption(msg) => {
                format!("Cached data was discarded: {}", msg)
            }
            EngineError::InvalidInput(reason) => {
                format!("Invalid input: {}", reason)
            }
            EngineError::WorkItemNotFound(id) => {
                format!("Task '{}' not found", id)
            }
            EngineError::Config(msg) => {
                format!("Configuration issue: {}", msg)
            }
            EngineError::Generic(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = EngineError::WorkItemNotFound("abc".to_string());
        assert!(err.user_message().contains("abc"));

        let err = EngineError::DataUnavailable("timed out".to_string());
        assert!(err.user_message().contains("timed out"));
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidItem("missing id".to_string());
        let display = format!("{}", err);
        assert!(display.contains("Invalid work item"));
    }
}
