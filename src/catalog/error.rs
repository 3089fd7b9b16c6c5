//! Loader errors.

use thiserror::Error;

/// Result type for loading a join graph.
pub type LoadResult<T> = Result<T, LoadError>;

/// Malformed-input errors raised while building a join graph.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("expected at least 3 input lines, found {found}")]
    MissingLines { found: usize },

    #[error("invalid relation count: {0:?}")]
    InvalidRelationCount(String),

    #[error("invalid cardinality {value:?} at position {position}")]
    InvalidCardinality { position: usize, value: String },

    #[error("expected {expected} cardinalities, found {found}")]
    CardinalityCountMismatch { expected: usize, found: usize },

    #[error("expected {expected} foreign-key entries, found {found}")]
    ForeignKeyCountMismatch { expected: usize, found: usize },

    #[error("unknown relation: {0:?}")]
    UnknownRelation(String),

    #[error("foreign key {name:?} is not an endpoint of edge {edge}")]
    ForeignKeyNotOnEdge { edge: usize, name: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
