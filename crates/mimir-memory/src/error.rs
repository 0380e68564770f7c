//! Error types for the memory crate.

use thiserror::Error;

/// Errors that can occur in the memory crate.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// An edge referenced a node id that is not in the store.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// The vector index returned an id the item table does not know.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// The embedding collaborator failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The vector-index collaborator failed.
    #[error("Index error: {0}")]
    Index(String),

    /// Snapshot serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot file I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
