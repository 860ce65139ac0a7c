//! Error types for the flexdex server.

use crate::mcp::protocol::JsonRpcError;
use flexdex_core::{EmbeddingError, LoadError, QueryError};
use thiserror::Error;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid arguments for {tool}: {message}")]
    BadArguments { tool: String, message: String },

    #[error("Invalid '{name}' parameter: {message}")]
    InvalidArgument { name: &'static str, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Index load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("No index directory configured")]
    NoIndexDir,

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServerError {
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        ServerError::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    /// Caused by the request rather than by the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::BadArguments { .. }
                | ServerError::InvalidArgument { .. }
                | ServerError::UnknownTool(_)
                | ServerError::Query(_)
        )
    }
}

impl From<ServerError> for JsonRpcError {
    fn from(err: ServerError) -> Self {
        if err.is_client_error() {
            JsonRpcError::invalid_params(err.to_string())
        } else {
            JsonRpcError::internal_error(err.to_string())
        }
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
