use thiserror::Error;
use tracing::{error, warn};

/// Error severity for host-side indicator display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational
    Warning,  // recoverable
    Error,    // operation failed
    Critical, // requires user action
}

/// Domain-specific errors for the expansion engine and host executor
#[derive(Error, Debug)]
pub enum AtalhoError {
    #[error("Failed to encode or decode bridge signal: {0}")]
    Signal(#[from] serde_json::Error),

    #[error("Clipboard operation failed: {0}")]
    Clipboard(String),

    #[error("Surface driver operation failed: {0}")]
    Driver(String),

    #[error("Surface not ready: {0}")]
    SurfaceNotReady(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AtalhoError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Signal(_) => ErrorSeverity::Warning,
            Self::Clipboard(_) => ErrorSeverity::Warning,
            Self::Driver(_) => ErrorSeverity::Warning,
            Self::SurfaceNotReady(_) => ErrorSeverity::Warning,
            Self::Config(_) => ErrorSeverity::Warning,
        }
    }
}

pub type Result<T> = std::result::Result<T, AtalhoError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// Every failure in the expansion pipeline is local-only: steps log and
/// continue instead of surfacing dialogs, so most call sites want
/// `.log_err()` or `.warn_on_err()` rather than `?`.
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?err,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?err,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_err_returns_value_on_ok() {
        let result: std::result::Result<i32, String> = Ok(42);
        assert_eq!(result.log_err(), Some(42));
    }

    #[test]
    fn test_log_err_returns_none_on_err() {
        let result: std::result::Result<i32, String> = Err("boom".to_string());
        assert_eq!(result.log_err(), None);
    }

    #[test]
    fn test_severity_mapping() {
        let err = AtalhoError::Clipboard("unavailable".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }
}
