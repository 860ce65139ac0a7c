//! Error types for flexdex-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a snapshot load.
///
/// A load that fails never publishes a snapshot; the previously served one
/// stays live.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading a source document failed
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source document is not valid JSON or not a document object
    #[error("Malformed document {document}: {message}")]
    MalformedDocument { document: String, message: String },

    /// A record references an entity or member missing from the batch
    #[error("Dangling reference in {record}: {kind} '{target}' does not exist")]
    DanglingReference {
        record: String,
        kind: &'static str,
        target: String,
    },

    /// Two records share an identifier that must be unique
    #[error("Duplicate {kind} identifier: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// A cross mapping places a member at a tier slot twice or in two slots
    #[error("Inconsistent mapping {mapping}: {message}")]
    InconsistentMapping { mapping: String, message: String },
}

impl LoadError {
    /// Create a malformed document error
    pub fn malformed(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            document: document.into(),
            message: message.into(),
        }
    }

    /// Create a dangling reference error
    pub fn dangling(record: impl Into<String>, kind: &'static str, target: impl Into<String>) -> Self {
        Self::DanglingReference {
            record: record.into(),
            kind,
            target: target.into(),
        }
    }
}

/// Errors returned by query operations against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The request names an entity or member absent from the snapshot
    #[error("Not found: {0}")]
    NotFound(String),

    /// Both entities exist but no relationship path connects them
    #[error("No path from '{from}' to '{to}'")]
    NoPathFound { from: String, to: String },

    /// The request itself is malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl QueryError {
    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Errors from the embedding layer.
///
/// These never surface from `search`; a failing semantic stage degrades to
/// lexical scoring.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedder could not produce a vector
    #[error("Embedding error: {0}")]
    Embed(String),

    /// Cache file IO failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file could not be (de)serialized
    #[error("Cache encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Cached vectors do not match the snapshot or embedder
    #[error("Stale embedding cache: {0}")]
    Stale(String),
}

/// Result type for load operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Result type for query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display_not_found() {
        let err = QueryError::not_found("Nonexistent");
        assert_eq!(err.to_string(), "Not found: Nonexistent");
    }

    #[test]
    fn test_query_error_display_no_path() {
        let err = QueryError::NoPathFound {
            from: "Entry".to_string(),
            to: "Island".to_string(),
        };
        assert_eq!(err.to_string(), "No path from 'Entry' to 'Island'");
    }

    #[test]
    fn test_not_found_is_distinct_from_no_path() {
        let missing = QueryError::not_found("X");
        let disconnected = QueryError::NoPathFound {
            from: "A".to_string(),
            to: "X".to_string(),
        };
        assert_ne!(missing, disconnected);
    }

    #[test]
    fn test_load_error_display_dangling() {
        let err = LoadError::dangling("relationship #3", "entity", "Ghost");
        assert_eq!(
            err.to_string(),
            "Dangling reference in relationship #3: entity 'Ghost' does not exist"
        );
    }

    #[test]
    fn test_load_error_display_duplicate() {
        let err = LoadError::DuplicateId {
            kind: "member",
            id: "Entry.SetGloss".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate member identifier: Entry.SetGloss");
    }

    #[test]
    fn test_embedding_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EmbeddingError = io_err.into();
        assert!(matches!(err, EmbeddingError::Io(_)));
    }
}
