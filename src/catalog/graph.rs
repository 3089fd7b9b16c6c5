//! The chain join graph.

use super::types::{JoinCondition, Relation};
use crate::planner::{CardinalityEstimator, Estimate, JoinOrderOptimizer, JoinPlan, PlanResult};

/// Relations of a chain join together with the foreign-key edges between them.
///
/// `relations[i].idx == i`, and `join_conditions[i]` connects relations
/// `i` and `i + 1`.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    relations: Vec<Relation>,
    join_conditions: Vec<JoinCondition>,
}

impl JoinGraph {
    /// Assemble a graph from already validated parts.
    pub(crate) fn from_parts(relations: Vec<Relation>, join_conditions: Vec<JoinCondition>) -> Self {
        Self {
            relations,
            join_conditions,
        }
    }

    /// All relations, ordered by chain index.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// All join conditions, ordered by edge index.
    pub fn join_conditions(&self) -> &[JoinCondition] {
        &self.join_conditions
    }

    /// Get a relation by chain index.
    pub fn relation(&self, idx: usize) -> Option<&Relation> {
        self.relations.get(idx)
    }

    /// Get the join condition between relations `edge` and `edge + 1`.
    pub fn join_condition(&self, edge: usize) -> Option<&JoinCondition> {
        self.join_conditions.get(edge)
    }

    /// Number of relations in the chain.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check whether the graph has no relations.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Estimate the output cardinality of joining exactly `relations`.
    pub fn estimate_cardinality(&self, relations: &[Relation]) -> PlanResult<Estimate> {
        CardinalityEstimator::new(self).estimate(relations)
    }

    /// Find the cheapest join tree over all relations with the default optimizer.
    pub fn best_join_order(&self) -> PlanResult<JoinPlan> {
        JoinOrderOptimizer::default().optimize(self)
    }
}
