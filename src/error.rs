//! Error types for userbase

use thiserror::Error;

use crate::mcp::protocol::codes;

/// Result type alias for userbase operations
pub type Result<T> = std::result::Result<T, UserbaseError>;

/// Main error type for userbase
#[derive(Error, Debug)]
pub enum UserbaseError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON-RPC error returned by the remote peer
    #[error("Remote error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// A channel line that is not JSON at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed JSON that is not a JSON-RPC message
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Console error: {0}")]
    Console(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UserbaseError {
    /// Get error code for MCP protocol.
    ///
    /// Local (de)serialization failures are internal errors; parse errors
    /// are only reported for unreadable lines on the channel.
    pub fn code(&self) -> i64 {
        match self {
            UserbaseError::NotFound(_) => codes::RESOURCE_NOT_FOUND,
            UserbaseError::InvalidInput(_) => codes::INVALID_PARAMS,
            UserbaseError::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            UserbaseError::Parse(_) => codes::PARSE_ERROR,
            UserbaseError::InvalidRequest(_) => codes::INVALID_REQUEST,
            UserbaseError::Protocol { code, .. } => *code,
            _ => codes::INTERNAL_ERROR,
        }
    }
}

impl From<dialoguer::Error> for UserbaseError {
    fn from(e: dialoguer::Error) -> Self {
        UserbaseError::Console(e.to_string())
    }
}
