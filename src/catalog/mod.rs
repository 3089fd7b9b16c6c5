//! Catalog module for the chain join graph.
//!
//! Holds the base relations, the foreign-key edges between them, and the
//! loader that builds a [`JoinGraph`] from its text description.

mod error;
mod graph;
mod loader;
mod types;

pub use error::{LoadError, LoadResult};
pub use graph::JoinGraph;
pub use loader::{load_graph, load_graph_from_path, load_graph_from_str};
pub use types::{JoinCondition, Relation};
