//! Join order planning.
//!
//! This module estimates join cardinalities over a chain join graph and
//! searches for the cheapest join tree with interval dynamic programming.

mod cardinality;
mod error;
mod optimizer;
mod plan;

pub use cardinality::{CardinalityEstimator, Estimate};
pub use error::{PlanError, PlanResult};
pub use optimizer::{JoinOrderOptimizer, OptimizerConfig};
pub use plan::JoinPlan;
