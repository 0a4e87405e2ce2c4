//! Error types shared across ShutterScope crates.

/// Top-level error type for ShutterScope operations.
#[derive(Debug, thiserror::Error)]
pub enum ShutterscopeError {
    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ShutterscopeError.
pub type ShutterscopeResult<T> = Result<T, ShutterscopeError>;

impl ShutterscopeError {
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }
}
