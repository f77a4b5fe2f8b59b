/// Unified error handling for the coro fleet core
///
/// Nothing in the core propagates an error past its public boundary; the
/// coordinator and stream manager report booleans and log. These types cover
/// the internal seams (gateway calls, loads, the settings store) and the
/// configuration layer.
use std::fmt;
use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::stats::StoreError;

/// Main error type for fleet operations
#[derive(Debug, Error)]
pub enum CoroError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Voice gateway errors
    #[error("Gateway error: {message}")]
    Gateway { message: String },

    /// Leadership election errors
    #[error("Election error: {message}")]
    Election { message: String },

    /// Stream/track load errors
    #[error("Stream load error: {source_id} - {message}")]
    StreamLoad { source_id: String, message: String },

    /// Settings/stats store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Timeout errors
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for fleet operations
pub type CoroResult<T> = Result<T, CoroError>;

/// Convenience methods for creating specific error types
impl CoroError {
    /// Create a gateway error
    pub fn gateway<S: Into<String>>(message: S) -> Self {
        CoroError::Gateway {
            message: message.into(),
        }
    }

    /// Create an election error
    pub fn election<S: Into<String>>(message: S) -> Self {
        CoroError::Election {
            message: message.into(),
        }
    }

    /// Create a stream load error
    pub fn stream_load<S: Into<String>>(source_id: S, message: S) -> Self {
        CoroError::StreamLoad {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        CoroError::Timeout {
            operation: operation.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        CoroError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            CoroError::Network(_) => true,
            CoroError::Gateway { .. } => true,
            CoroError::StreamLoad { .. } => true,
            CoroError::Store(_) => true,
            CoroError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoroError::Config(_) => ErrorSeverity::Critical,
            CoroError::Internal { .. } => ErrorSeverity::Critical,
            CoroError::Election { .. } => ErrorSeverity::Error,
            CoroError::Network(_) => ErrorSeverity::Warning,
            CoroError::Gateway { .. } => ErrorSeverity::Warning,
            CoroError::Timeout { .. } => ErrorSeverity::Warning,
            CoroError::StreamLoad { .. } => ErrorSeverity::Info,
            CoroError::Store(_) => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors that affect functionality but don't crash the system
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational messages about recoverable issues
    Info,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Info => write!(f, "INFO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = CoroError::gateway("Voice connection refused");
        assert!(matches!(error, CoroError::Gateway { .. }));
        assert_eq!(error.to_string(), "Gateway error: Voice connection refused");
    }

    #[test]
    fn test_error_severity() {
        let config_error = CoroError::Config(ConfigError::ValidationError("test".to_string()));
        assert_eq!(config_error.severity(), ErrorSeverity::Critical);

        let gateway_error = CoroError::gateway("test");
        assert_eq!(gateway_error.severity(), ErrorSeverity::Warning);

        let store_error = CoroError::Store(StoreError::Unavailable("test".to_string()));
        assert_eq!(store_error.severity(), ErrorSeverity::Info);
    }

    #[test]
    fn test_error_recoverability() {
        let network_error =
            CoroError::Network(io::Error::new(io::ErrorKind::ConnectionRefused, "test"));
        assert!(network_error.is_recoverable());

        let load_error = CoroError::stream_load("http://radio.example/live", "503");
        assert!(load_error.is_recoverable());

        let config_error = CoroError::Config(ConfigError::ValidationError("test".to_string()));
        assert!(!config_error.is_recoverable());

        let election_error = CoroError::election("no healthy node");
        assert!(!election_error.is_recoverable());
    }
}
