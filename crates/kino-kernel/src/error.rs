//! Error types for Kino Kernel

use thiserror::Error;

/// Result type alias for kernel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kernel error types
#[derive(Error, Debug)]
pub enum Error {
    // Construction errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Lifecycle errors
    #[error("Cannot {operation} in {state} state")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    // Errors raised by the streaming engine or the playback surface
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Returns true if the caller may recover by refreshing the kernel
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Engine(_))
    }

    /// Returns the error code for logs and analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::InvalidState { .. } => "INVALID_STATE",
            Error::Engine(_) => "ENGINE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::invalid_argument("x").error_code(), "INVALID_ARGUMENT");
        assert_eq!(
            Error::InvalidState { operation: "play", state: "destroyed".into() }.error_code(),
            "INVALID_STATE"
        );
        assert_eq!(Error::from(anyhow::anyhow!("boom")).error_code(), "ENGINE");
    }

    #[test]
    fn test_engine_errors_are_transparent() {
        let err = Error::from(anyhow::anyhow!("manifest 404"));
        assert_eq!(err.to_string(), "manifest 404");
        assert!(err.is_recoverable());
        assert!(!Error::InvalidConfig("src".into()).is_recoverable());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = Error::InvalidState { operation: "seek", state: "destroyed".into() };
        assert_eq!(err.to_string(), "Cannot seek in destroyed state");
    }
}
