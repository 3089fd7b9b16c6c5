//! Cost-based join ordering over chain intervals.
//!
//! The search is an interval dynamic program: the best plan for every
//! contiguous sub-chain `[i, j]` is built from the best plans of
//! `[i, k]` and `[k + 1, j]`, widths growing from 1 to `n`. Plan cost is the
//! sum of the output cardinalities of every join in the tree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace};

use super::cardinality::CardinalityEstimator;
use super::error::{PlanError, PlanResult};
use super::plan::JoinPlan;
use crate::catalog::JoinGraph;

/// Join order search configuration.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Reject graphs with more relations than this before searching.
    pub max_relations: Option<usize>,
    /// Log a warning for every Cartesian product the estimator sees.
    pub warn_on_cartesian: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_relations: None,
            warn_on_cartesian: true,
        }
    }
}

impl OptimizerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relation limit.
    pub fn max_relations(mut self, limit: usize) -> Self {
        self.max_relations = Some(limit);
        self
    }

    /// Set the warn_on_cartesian flag.
    pub fn warn_on_cartesian(mut self, value: bool) -> Self {
        self.warn_on_cartesian = value;
        self
    }
}

/// Inclusive chain interval `[i, j]`.
type Interval = (usize, usize);

/// Best plan found so far for one interval.
#[derive(Debug, Clone, Copy)]
struct TableEntry {
    est_out_card: u128,
    est_cost: u128,
    /// `(left, right)` sub-intervals, `None` for a single relation.
    children: Option<(Interval, Interval)>,
}

/// DP table indexed by interval. Wider entries refer to narrower ones by
/// interval instead of owning them, so one sub-plan can back many
/// candidates.
struct PlanTable {
    n: usize,
    entries: Vec<Option<TableEntry>>,
}

impl PlanTable {
    fn new(n: usize) -> Self {
        Self {
            n,
            entries: vec![None; n * n],
        }
    }

    fn insert(&mut self, (i, j): Interval, entry: TableEntry) {
        self.entries[i * self.n + j] = Some(entry);
    }

    fn get(&self, (i, j): Interval) -> PlanResult<TableEntry> {
        self.entries
            .get(i * self.n + j)
            .copied()
            .flatten()
            .ok_or_else(|| PlanError::Internal(format!("no plan for interval [{}, {}]", i, j)))
    }

    /// Materialize the owned join tree rooted at `interval`.
    fn extract(&self, graph: &JoinGraph, interval: Interval) -> PlanResult<JoinPlan> {
        let entry = self.get(interval)?;
        match entry.children {
            Some((left, right)) => {
                let left = self.extract(graph, left)?;
                let right = self.extract(graph, right)?;
                JoinPlan::join(left, right, entry.est_out_card)
            }
            None => {
                let relation = graph.relation(interval.0).ok_or_else(|| {
                    PlanError::Internal(format!("no relation at index {}", interval.0))
                })?;
                Ok(JoinPlan::leaf(relation.clone()))
            }
        }
    }
}

/// Finds the cheapest join tree over the contiguous sub-chains of a graph.
#[derive(Debug, Clone, Default)]
pub struct JoinOrderOptimizer {
    config: OptimizerConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl JoinOrderOptimizer {
    /// Create an optimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Attach a flag that aborts the search when set.
    ///
    /// The flag is checked before each interval width starts, never in the
    /// middle of one.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Find the minimum-cost join tree spanning every relation of `graph`.
    ///
    /// Among candidates of equal cost for one interval, the one with the
    /// lowest split point wins.
    pub fn optimize(&self, graph: &JoinGraph) -> PlanResult<JoinPlan> {
        let n = graph.len();
        if n == 0 {
            return Err(PlanError::EmptyGraph);
        }
        if let Some(limit) = self.config.max_relations {
            if n > limit {
                return Err(PlanError::TooManyRelations { limit, found: n });
            }
        }

        let relations = graph.relations();
        let estimator =
            CardinalityEstimator::new(graph).warn_on_cartesian(self.config.warn_on_cartesian);
        let mut table = PlanTable::new(n);

        for (i, relation) in relations.iter().enumerate() {
            table.insert(
                (i, i),
                TableEntry {
                    est_out_card: u128::from(relation.cardinality),
                    est_cost: 0,
                    children: None,
                },
            );
        }

        if n >= 2 {
            self.check_cancelled()?;
            debug!("Planning {} intervals of width 2", n - 1);
        }
        for i in 0..n.saturating_sub(1) {
            // Pairs are oriented by base cardinality; ties keep chain order.
            let (left, right) = if relations[i + 1].cardinality < relations[i].cardinality {
                ((i + 1, i + 1), (i, i))
            } else {
                ((i, i), (i + 1, i + 1))
            };
            let est_out_card = estimator.estimate(&relations[i..=i + 1])?.rows();
            table.insert(
                (i, i + 1),
                TableEntry {
                    est_out_card,
                    est_cost: est_out_card,
                    children: Some((left, right)),
                },
            );
        }

        for width in 3..=n {
            self.check_cancelled()?;
            debug!("Planning {} intervals of width {}", n - width + 1, width);

            for i in 0..=n - width {
                let j = i + width - 1;
                // Every split of [i, j] joins the same relation set.
                let estimate = estimator.estimate(&relations[i..=j])?;
                if estimate.has_cartesian_product() {
                    debug!(
                        "Interval [{}, {}] has {} Cartesian pairs",
                        i, j, estimate.cartesian_pairs
                    );
                }
                let est_out_card = estimate.rows();

                let mut best: Option<TableEntry> = None;
                for k in i..j {
                    let lower = table.get((i, k))?;
                    let upper = table.get((k + 1, j))?;
                    let (left, right) = if lower.est_out_card < upper.est_out_card {
                        (((i, k), lower), ((k + 1, j), upper))
                    } else {
                        (((k + 1, j), upper), ((i, k), lower))
                    };

                    let est_cost = left
                        .1
                        .est_cost
                        .checked_add(right.1.est_cost)
                        .and_then(|cost| cost.checked_add(est_out_card))
                        .ok_or(PlanError::CostOverflow)?;
                    trace!(
                        "Interval [{}, {}] split at {}: rows {}, cost {}",
                        i,
                        j,
                        k,
                        est_out_card,
                        est_cost
                    );

                    if best.map_or(true, |b| est_cost < b.est_cost) {
                        best = Some(TableEntry {
                            est_out_card,
                            est_cost,
                            children: Some((left.0, right.0)),
                        });
                    }
                }

                let best = best.ok_or_else(|| {
                    PlanError::Internal(format!("no candidate for interval [{}, {}]", i, j))
                })?;
                table.insert((i, j), best);
            }
        }

        let plan = table.extract(graph, (0, n - 1))?;
        info!(
            "Chose join order {} (rows: {}, cost: {})",
            plan.expression(),
            plan.est_out_card(),
            plan.est_cost()
        );
        Ok(plan)
    }

    fn check_cancelled(&self) -> PlanResult<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(PlanError::Cancelled),
            _ => Ok(()),
        }
    }
}
