//! Output cardinality estimation for sets of chain relations.
//!
//! Relations are walked in chain order. Each relation multiplies the running
//! estimate by its cardinality; when it is adjacent to the previous one the
//! foreign-key edge between them contributes a selectivity of
//! `1 / |foreign relation|`. Non-adjacent pairs have no join predicate and are
//! treated as a Cartesian product.
//!
//! The running value stays an exact integer until the first division and is
//! a float from then on. Only the final value is truncated to whole rows.

use std::collections::HashSet;

use log::{trace, warn};

use super::error::{PlanError, PlanResult};
use crate::catalog::{JoinGraph, Relation};

/// 2^128, the first float that no longer fits in a `u128`.
const U128_BOUND: f64 = 340_282_366_920_938_463_463_374_607_431_768_211_456.0;

/// Result of estimating one relation set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Estimated output cardinality, before truncation.
    pub cardinality: f64,
    /// Number of neighbouring pairs (in chain order) that had no join edge.
    pub cartesian_pairs: usize,
    rows: u128,
}

impl Estimate {
    /// The estimate truncated to whole rows, as stored in a plan.
    pub fn rows(&self) -> u128 {
        self.rows
    }

    /// Check whether any pair was estimated as a Cartesian product.
    pub fn has_cartesian_product(&self) -> bool {
        self.cartesian_pairs > 0
    }
}

/// Running product of the estimator.
#[derive(Debug, Clone, Copy)]
enum Running {
    Exact(u128),
    Approx(f64),
}

impl Running {
    fn multiply(self, factor: u64) -> Self {
        match self {
            Running::Exact(n) => match n.checked_mul(u128::from(factor)) {
                Some(product) => Running::Exact(product),
                None => Running::Approx(n as f64 * factor as f64),
            },
            Running::Approx(v) => Running::Approx(v * factor as f64),
        }
    }

    /// Divide by a non-zero cardinality.
    fn divide(self, divisor: u64) -> Self {
        match self {
            // The divisor is one of the factors already multiplied in, so the
            // integer quotient is exact and rounds once on conversion.
            Running::Exact(n) if n % u128::from(divisor) == 0 => {
                Running::Approx((n / u128::from(divisor)) as f64)
            }
            Running::Exact(n) => Running::Approx(n as f64 / divisor as f64),
            Running::Approx(v) => Running::Approx(v / divisor as f64),
        }
    }

    fn value(self) -> f64 {
        match self {
            Running::Exact(n) => n as f64,
            Running::Approx(v) => v,
        }
    }

    fn rows(self) -> PlanResult<u128> {
        match self {
            Running::Exact(n) => Ok(n),
            Running::Approx(v) if v.is_finite() && v < U128_BOUND => Ok(v as u128),
            Running::Approx(v) => Err(PlanError::CardinalityOverflow(v.to_string())),
        }
    }
}

/// Estimates join output cardinalities against a join graph.
pub struct CardinalityEstimator<'a> {
    graph: &'a JoinGraph,
    warn_on_cartesian: bool,
}

impl<'a> CardinalityEstimator<'a> {
    /// Create an estimator for the given graph.
    pub fn new(graph: &'a JoinGraph) -> Self {
        Self {
            graph,
            warn_on_cartesian: true,
        }
    }

    /// Enable or disable the Cartesian-product warning record.
    pub fn warn_on_cartesian(mut self, value: bool) -> Self {
        self.warn_on_cartesian = value;
        self
    }

    /// Estimate the output cardinality of joining exactly `relations`.
    ///
    /// The input order does not matter. At least two distinct relations of
    /// the graph are required.
    pub fn estimate(&self, relations: &[Relation]) -> PlanResult<Estimate> {
        if relations.len() < 2 {
            return Err(PlanError::TooFewRelations {
                found: relations.len(),
            });
        }

        let mut sorted: Vec<&Relation> = relations.iter().collect();
        sorted.sort_by_key(|r| r.idx);
        self.validate(&sorted)?;

        let mut running = Running::Exact(u128::from(sorted[0].cardinality));
        let mut cartesian_pairs = 0;

        for pair in sorted.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            running = running.multiply(curr.cardinality);

            if prev.precedes(curr) {
                let condition = self.graph.join_condition(prev.idx).ok_or_else(|| {
                    PlanError::Internal(format!("missing join condition for edge {}", prev.idx))
                })?;
                if condition.foreign.cardinality == 0 {
                    return Err(PlanError::ZeroForeignCardinality(condition.foreign.to_string()));
                }
                running = running.divide(condition.foreign.cardinality);
            } else {
                cartesian_pairs += 1;
                if self.warn_on_cartesian {
                    warn!(
                        "Estimating join relations containing Cartesian product: {} x {}",
                        prev.name, curr.name
                    );
                }
            }
        }

        let cardinality = running.value();
        trace!(
            "Estimated {} rows for [{}]",
            cardinality,
            sorted
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Estimate {
            cardinality,
            cartesian_pairs,
            rows: running.rows()?,
        })
    }

    fn validate(&self, sorted: &[&Relation]) -> PlanResult<()> {
        let mut seen = HashSet::new();
        for relation in sorted {
            if !seen.insert(relation.idx) {
                return Err(PlanError::DuplicateRelation(relation.to_string()));
            }
            if self.graph.relation(relation.idx) != Some(*relation) {
                return Err(PlanError::UnknownRelation(relation.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::Once;

    use log::{Level, LevelFilter, Log, Metadata, Record};

    use super::*;
    use crate::catalog::load_graph;

    thread_local! {
        static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    /// Keeps the records emitted on the current test thread.
    struct CaptureLogger;

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            RECORDS.with(|r| r.borrow_mut().push((record.level(), record.args().to_string())));
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;
    static INIT: Once = Once::new();

    fn captured<F: FnOnce()>(f: F) -> Vec<(Level, String)> {
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(LevelFilter::Trace);
        });
        RECORDS.with(|r| r.borrow_mut().clear());
        f();
        RECORDS.with(|r| r.borrow_mut().drain(..).collect())
    }

    fn warnings(records: &[(Level, String)]) -> Vec<&str> {
        records
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    fn chain() -> JoinGraph {
        load_graph(&["3", "50,10,20", "R0,R1"]).unwrap()
    }

    fn pick(graph: &JoinGraph, indices: &[usize]) -> Vec<Relation> {
        indices
            .iter()
            .map(|&i| graph.relation(i).unwrap().clone())
            .collect()
    }

    #[test]
    fn test_adjacent_pair_divides_by_foreign() {
        let graph = load_graph(&["2", "100,5", "R1"]).unwrap();
        let estimate = graph.estimate_cardinality(&pick(&graph, &[0, 1])).unwrap();

        assert_eq!(estimate.cardinality, 100.0);
        assert_eq!(estimate.rows(), 100);
        assert!(!estimate.has_cartesian_product());
    }

    #[test]
    fn test_chain_of_three() {
        let graph = chain();
        // 50 * 10 / 50 * 20 / 10
        let estimate = graph.estimate_cardinality(&pick(&graph, &[0, 1, 2])).unwrap();
        assert_eq!(estimate.rows(), 20);
        assert_eq!(estimate.cartesian_pairs, 0);
    }

    #[test]
    fn test_order_insensitive() {
        let graph = load_graph(&["4", "7,300,12,45", "R1,R1,R3"]).unwrap();
        let forward = graph.estimate_cardinality(&pick(&graph, &[0, 1, 2, 3])).unwrap();
        let shuffled = graph.estimate_cardinality(&pick(&graph, &[2, 0, 3, 1])).unwrap();
        let reversed = graph.estimate_cardinality(&pick(&graph, &[3, 2, 1, 0])).unwrap();

        assert_eq!(forward, shuffled);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_non_adjacent_is_cartesian() {
        let graph = chain();
        let estimate = graph.estimate_cardinality(&pick(&graph, &[2, 0])).unwrap();

        assert_eq!(estimate.cardinality, 50.0 * 20.0);
        assert_eq!(estimate.cartesian_pairs, 1);
        assert!(estimate.has_cartesian_product());
    }

    #[test]
    fn test_skipping_index_mixes_selectivity_and_cartesian() {
        let graph = load_graph(&["4", "10,20,30,40", "R0,R1,R2"]).unwrap();
        // R0 x R2 has no edge; R2-R3 divides by |R2|.
        let estimate = CardinalityEstimator::new(&graph)
            .warn_on_cartesian(false)
            .estimate(&pick(&graph, &[0, 2, 3]))
            .unwrap();

        assert_eq!(estimate.cardinality, 10.0 * 30.0 * 40.0 / 30.0);
        assert_eq!(estimate.cartesian_pairs, 1);
    }

    #[test]
    fn test_real_division_before_truncation() {
        let graph = load_graph(&["3", "3,7,2", "R0,R2"]).unwrap();
        // 3 * 7 / 3 = 7, then 7 * 2 / 2 = 7
        assert_eq!(graph.estimate_cardinality(&pick(&graph, &[0, 1, 2])).unwrap().rows(), 7);

        let graph = load_graph(&["2", "7,3", "R1"]).unwrap();
        let estimate = graph.estimate_cardinality(&pick(&graph, &[0, 1])).unwrap();
        assert_eq!(estimate.cardinality, 7.0);

        let graph = load_graph(&["3", "5,3,7", "R1,R1"]).unwrap();
        // 5 * 3 / 3 = 5, 5 * 7 / 3 = 11.67
        let estimate = graph.estimate_cardinality(&pick(&graph, &[0, 1, 2])).unwrap();
        assert!((estimate.cardinality - 35.0 / 3.0).abs() < 1e-9);
        assert_eq!(estimate.rows(), 11);
    }

    #[test]
    fn test_too_few_relations() {
        let graph = chain();
        assert_eq!(
            graph.estimate_cardinality(&pick(&graph, &[1])),
            Err(PlanError::TooFewRelations { found: 1 })
        );
        assert_eq!(
            graph.estimate_cardinality(&[]),
            Err(PlanError::TooFewRelations { found: 0 })
        );
    }

    #[test]
    fn test_duplicate_relation() {
        let graph = chain();
        let result = graph.estimate_cardinality(&pick(&graph, &[1, 1]));
        assert!(matches!(result, Err(PlanError::DuplicateRelation(_))));
    }

    #[test]
    fn test_unknown_relation() {
        let graph = chain();
        let stranger = vec![graph.relation(0).unwrap().clone(), Relation::new("R9", 9, 3)];
        let result = graph.estimate_cardinality(&stranger);
        assert!(matches!(result, Err(PlanError::UnknownRelation(_))));

        let altered = vec![graph.relation(0).unwrap().clone(), Relation::new("R1", 1, 999)];
        let result = graph.estimate_cardinality(&altered);
        assert!(matches!(result, Err(PlanError::UnknownRelation(_))));
    }

    #[test]
    fn test_zero_foreign_cardinality() {
        let graph = load_graph(&["2", "10,0", "R1"]).unwrap();
        let result = graph.estimate_cardinality(&pick(&graph, &[0, 1]));
        assert!(matches!(result, Err(PlanError::ZeroForeignCardinality(_))));
    }

    #[test]
    fn test_zero_primary_cardinality_propagates() {
        let graph = load_graph(&["2", "0,10", "R1"]).unwrap();
        let estimate = graph.estimate_cardinality(&pick(&graph, &[0, 1])).unwrap();
        assert_eq!(estimate.rows(), 0);
    }

    #[test]
    fn test_product_exact_before_first_division() {
        // The product exceeds 2^53; rounding it before dividing gives 6565144772.
        let graph = load_graph(&["2", "8185185732,6565144773", "R0"]).unwrap();
        let estimate = graph.estimate_cardinality(&pick(&graph, &[0, 1])).unwrap();
        assert_eq!(estimate.rows(), 6_565_144_773);
    }

    #[test]
    fn test_rows_beyond_u64() {
        let graph = load_graph(&["3", "10000000000000,3,10000000000", "R1,R1"]).unwrap();
        let estimate = CardinalityEstimator::new(&graph)
            .warn_on_cartesian(false)
            .estimate(&pick(&graph, &[0, 2]))
            .unwrap();
        assert_eq!(estimate.rows(), 100_000_000_000_000_000_000_000);
        assert!(estimate.rows() > u128::from(u64::MAX));
    }

    #[test]
    fn test_cartesian_warning_is_logged() {
        let graph = chain();
        let records = captured(|| {
            graph.estimate_cardinality(&pick(&graph, &[0, 2])).unwrap();
        });

        let warned = warnings(&records);
        assert_eq!(warned.len(), 1);
        assert!(warned[0].contains("Cartesian product: R0 x R2"));
    }

    #[test]
    fn test_cartesian_warning_can_be_disabled() {
        let graph = chain();
        let records = captured(|| {
            let estimate = CardinalityEstimator::new(&graph)
                .warn_on_cartesian(false)
                .estimate(&pick(&graph, &[0, 2]))
                .unwrap();
            assert_eq!(estimate.cartesian_pairs, 1);
        });
        assert!(warnings(&records).is_empty());
    }

    #[test]
    fn test_adjacent_chain_does_not_warn() {
        let graph = chain();
        let records = captured(|| {
            graph.estimate_cardinality(&pick(&graph, &[0, 1, 2])).unwrap();
        });
        assert!(warnings(&records).is_empty());
    }
}
