//! ChainJoin - join order optimization for foreign-key chain joins.
//!
//! This crate loads a chain of relations connected by foreign-key edges,
//! estimates join cardinalities, and picks the cheapest join tree with a
//! bottom-up dynamic program over contiguous sub-chains.
//!
//! # Example
//!
//! ```
//! use chainjoin::catalog::load_graph;
//!
//! let graph = load_graph(&["3", "50,10,20", "R0,R1"]).unwrap();
//! let plan = graph.best_join_order().unwrap();
//! assert_eq!(plan.expression(), "((R1 ⋈ R0) ⋈ R2)");
//! assert_eq!(plan.est_cost(), 30);
//! ```

pub mod catalog;
pub mod planner;

pub use catalog::{JoinGraph, LoadError};
pub use planner::{JoinOrderOptimizer, JoinPlan, OptimizerConfig, PlanError};
