//! Planning errors.

use thiserror::Error;

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Join ordering and estimation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("join graph has no relations")]
    EmptyGraph,

    #[error("cardinality estimation needs at least 2 relations, got {found}")]
    TooFewRelations { found: usize },

    #[error("duplicate relation: {0}")]
    DuplicateRelation(String),

    #[error("relation not in join graph: {0}")]
    UnknownRelation(String),

    #[error("foreign relation {0} has zero cardinality")]
    ZeroForeignCardinality(String),

    #[error("estimated cardinality {0} does not fit in 128 bits")]
    CardinalityOverflow(String),

    #[error("estimated plan cost does not fit in 128 bits")]
    CostOverflow,

    #[error("join graph has {found} relations, limit is {limit}")]
    TooManyRelations { limit: usize, found: usize },

    #[error("join order search cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}
