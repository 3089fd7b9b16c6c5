//! Join tree representation.

use std::fmt;

use serde::Serialize;

use super::error::{PlanError, PlanResult};
use crate::catalog::Relation;

/// A binary join tree annotated with estimated cardinality and cost.
///
/// A leaf wraps one base relation and costs nothing. An internal node owns
/// both children and costs `left.cost + right.cost + out_card`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    left: Option<Box<JoinPlan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    right: Option<Box<JoinPlan>>,
    relations: Vec<Relation>,
    est_out_card: u128,
    est_cost: u128,
}

impl JoinPlan {
    /// Create a leaf plan scanning a single relation.
    pub fn leaf(relation: Relation) -> Self {
        Self {
            left: None,
            right: None,
            est_out_card: u128::from(relation.cardinality),
            est_cost: 0,
            relations: vec![relation],
        }
    }

    /// Create a join of two sub-plans.
    ///
    /// The relation set is the union of both children, kept sorted by chain
    /// index. Fails if the accumulated cost overflows.
    pub fn join(left: JoinPlan, right: JoinPlan, est_out_card: u128) -> PlanResult<Self> {
        let mut relations = Vec::with_capacity(left.relations.len() + right.relations.len());
        relations.extend(left.relations.iter().cloned());
        relations.extend(right.relations.iter().cloned());
        relations.sort_by_key(|r| r.idx);

        let est_cost = left
            .est_cost
            .checked_add(right.est_cost)
            .and_then(|cost| cost.checked_add(est_out_card))
            .ok_or(PlanError::CostOverflow)?;

        Ok(Self {
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            relations,
            est_out_card,
            est_cost,
        })
    }

    /// Check if this is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Left child, the smaller input of the join.
    pub fn left(&self) -> Option<&JoinPlan> {
        self.left.as_deref()
    }

    /// Right child.
    pub fn right(&self) -> Option<&JoinPlan> {
        self.right.as_deref()
    }

    /// Relations covered by this plan, sorted by chain index.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Estimated output cardinality.
    pub fn est_out_card(&self) -> u128 {
        self.est_out_card
    }

    /// Estimated cost: sum of all intermediate and final output cardinalities.
    pub fn est_cost(&self) -> u128 {
        self.est_cost
    }

    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let left = self.left().map_or(0, JoinPlan::depth);
        let right = self.right().map_or(0, JoinPlan::depth);
        1 + left.max(right)
    }

    /// Base relations in left-to-right leaf order.
    pub fn leaves(&self) -> Vec<&Relation> {
        let mut out = Vec::with_capacity(self.relations.len());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Relation>) {
        match (self.left(), self.right()) {
            (Some(left), Some(right)) => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
            _ => out.extend(self.relations.iter()),
        }
    }

    /// Compact join order, e.g. `((R1 ⋈ R0) ⋈ R2)`.
    pub fn expression(&self) -> String {
        match (self.left(), self.right()) {
            (Some(left), Some(right)) => {
                format!("({} ⋈ {})", left.expression(), right.expression())
            }
            _ => self
                .relations
                .first()
                .map(|r| r.name.clone())
                .unwrap_or_default(),
        }
    }

    fn format_node(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);

        match (self.left(), self.right()) {
            (Some(left), Some(right)) => {
                let names: Vec<_> = self.relations.iter().map(|r| r.name.as_str()).collect();
                writeln!(
                    f,
                    "{}Join: [{}] (rows: {}, cost: {})",
                    pad,
                    names.join(", "),
                    self.est_out_card,
                    self.est_cost
                )?;
                left.format_node(f, indent + 1)?;
                right.format_node(f, indent + 1)
            }
            _ => {
                for relation in &self.relations {
                    writeln!(
                        f,
                        "{}Scan: {} (rows: {}, cost: {})",
                        pad, relation, self.est_out_card, self.est_cost
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for JoinPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Join Plan (estimated cost: {}):", self.est_cost)?;
        self.format_node(f, 0)
    }
}
