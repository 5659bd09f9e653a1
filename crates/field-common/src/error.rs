//! Error types for the field visualization crates.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Primary error type for field loading and rendering.
///
/// Numeric edge cases (degenerate domains, non-finite values, zero-length
/// segments) never surface here; they resolve to documented fallbacks.
#[derive(Debug, Error)]
pub enum FieldError {
    // === Query Errors ===
    #[error("Query '{operation}' failed: {message}")]
    Query { operation: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    // === Data Errors ===
    #[error("Failed to decode packed array: {0}")]
    Decode(String),

    #[error("Invalid field snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Frame index {index} out of range (frames: {count})")]
    FrameOutOfRange { index: usize, count: usize },

    // === Rendering Errors ===
    #[error("Invalid palette: {0}")]
    InvalidPalette(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FieldError {
    /// Create a Query error for a backend `status: "error"` response.
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the data layer and must be shown to the user.
    ///
    /// Data errors stop playback and raise a blocking notification.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            FieldError::Query { .. }
                | FieldError::Decode(_)
                | FieldError::InvalidSnapshot(_)
                | FieldError::FrameOutOfRange { .. }
                | FieldError::Transport(_)
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for FieldError {
    fn from(err: std::io::Error) -> Self {
        FieldError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::InvalidSnapshot(format!("JSON error: {}", err))
    }
}

impl From<base64::DecodeError> for FieldError {
    fn from(err: base64::DecodeError) -> Self {
        FieldError::Decode(err.to_string())
    }
}
